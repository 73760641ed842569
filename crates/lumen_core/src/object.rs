// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reference-counted runtime objects.
//!
//! An [`Object`] is a shared handle to a [`Value`]. Cloning the handle
//! shares the cell; [`Object::duplicate`] runs the value's copy operation
//! and yields a fresh cell with a reference count of one. The set of value
//! kinds is closed, so dispatch is a plain `match`.

use crate::closure::Closure;
use crate::eval::RuntimeError;
use crate::frame::{Image, Transform};
use crate::term::Term;
use crate::types::{Type, ValueType};
use lumen_curve::{Curve, Keyframe};
use std::fmt;
use std::sync::{Arc, LazyLock};

static UNDEFINED: LazyLock<Object> = LazyLock::new(|| Object(Arc::new(Value::Undefined)));

/// A propagated runtime failure carried as a value
#[derive(Debug, Clone, PartialEq)]
pub struct Exception {
    /// Human readable message
    pub message: String,
}

/// Payload of an object
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent object
    Undefined,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// String
    String(String),
    /// Frame buffer
    Image(Image),
    /// Affine transform
    Transform(Transform),
    /// Animation curve
    Curve(Curve),
    /// A type as a value
    Type(Type),
    /// Partially applied primitive
    Closure(Closure),
    /// Runtime failure
    Exception(Exception),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Image(a), Self::Image(b)) => a == b,
            (Self::Transform(a), Self::Transform(b)) => a == b,
            (Self::Curve(a), Self::Curve(b)) => a == b,
            (Self::Type(a), Self::Type(b)) => a == b,
            (Self::Exception(a), Self::Exception(b)) => a == b,
            // Closures have no structural equality
            _ => false,
        }
    }
}

/// Static description of an object's kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectDescriptor {
    /// Nominal type of the value (closures report their primitive's type separately)
    pub value_type: ValueType,
    /// Kind name
    pub name: &'static str,
    /// Size of the payload in bytes
    pub size: usize,
}

/// Shared handle to a runtime value
#[derive(Clone)]
pub struct Object(Arc<Value>);

impl Object {
    /// Allocate a new object with a reference count of one
    pub fn new(value: Value) -> Self {
        Self(Arc::new(value))
    }

    /// The shared `Undefined` singleton
    pub fn undefined() -> Self {
        UNDEFINED.clone()
    }

    /// Treat an absent object as `Undefined`
    pub fn or_undefined(object: Option<Object>) -> Self {
        object.unwrap_or_else(Self::undefined)
    }

    /// Boolean object
    pub fn bool(value: bool) -> Self {
        Self::new(Value::Bool(value))
    }

    /// Integer object
    pub fn int(value: i64) -> Self {
        Self::new(Value::Int(value))
    }

    /// Float object
    pub fn float(value: f64) -> Self {
        Self::new(Value::Float(value))
    }

    /// String object
    pub fn string(value: impl Into<String>) -> Self {
        Self::new(Value::String(value.into()))
    }

    /// Image object
    pub fn image(value: Image) -> Self {
        Self::new(Value::Image(value))
    }

    /// Transform object
    pub fn transform(value: Transform) -> Self {
        Self::new(Value::Transform(value))
    }

    /// Curve object
    pub fn curve(value: Curve) -> Self {
        Self::new(Value::Curve(value))
    }

    /// Closure object
    pub fn closure(value: Closure) -> Self {
        Self::new(Value::Closure(value))
    }

    /// Exception object
    pub fn exception(message: impl Into<String>) -> Self {
        Self::new(Value::Exception(Exception { message: message.into() }))
    }

    /// Run the value's copy operation, giving an unshared object
    pub fn duplicate(&self) -> Self {
        Self::new((*self.0).clone())
    }

    /// Payload
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Number of live handles to this cell
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Whether this is the shared `Undefined` singleton
    pub fn is_singleton(&self) -> bool {
        Arc::ptr_eq(&self.0, &UNDEFINED.0)
    }

    /// Whether two handles share a cell
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the cell, used as an identity key
    pub(crate) fn address(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Descriptor of the value's kind
    pub fn descriptor(&self) -> ObjectDescriptor {
        let (value_type, size) = match self.value() {
            Value::Undefined => (ValueType::UNDEFINED, 0),
            Value::Bool(_) => (ValueType::BOOL, size_of::<bool>()),
            Value::Int(_) => (ValueType::INT, size_of::<i64>()),
            Value::Float(_) => (ValueType::FLOAT, size_of::<f64>()),
            Value::String(s) => (ValueType::STRING, s.len()),
            Value::Image(img) => (ValueType::IMAGE, img.byte_size()),
            Value::Transform(_) => (ValueType::TRANSFORM, size_of::<Transform>()),
            Value::Curve(c) => (ValueType::CURVE, c.len() * size_of::<Keyframe>()),
            Value::Type(_) => (ValueType::TYPE, size_of::<Type>()),
            Value::Closure(c) => (
                ValueType::UNDEFINED,
                size_of::<Closure>() + c.bound().len() * size_of::<Term>(),
            ),
            Value::Exception(e) => (ValueType::EXCEPTION, e.message.len()),
        };
        ObjectDescriptor {
            value_type,
            name: self.kind_name(),
            size,
        }
    }

    /// Kind name used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self.value() {
            Value::Undefined => "Undefined",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Image(_) => "Image",
            Value::Transform(_) => "Transform",
            Value::Curve(_) => "Curve",
            Value::Type(_) => "Type",
            Value::Closure(_) => "Closure",
            Value::Exception(_) => "Exception",
        }
    }

    /// Whether this is a raised exception
    pub fn is_exception(&self) -> bool {
        matches!(self.value(), Value::Exception(_))
    }

    /// Runtime type of the value. An exception inhabits every type.
    pub fn type_of(&self) -> Type {
        match self.value() {
            Value::Closure(c) => c.ty(),
            Value::Exception(_) => Type::fresh_var(),
            _ => Type::value(self.descriptor().value_type),
        }
    }

    fn cast_error(&self, expected: &'static str) -> RuntimeError {
        RuntimeError::BadValueCast {
            expected,
            found: self.kind_name(),
        }
    }

    /// Read as a boolean
    pub fn as_bool(&self) -> Result<bool, RuntimeError> {
        match self.value() {
            Value::Bool(v) => Ok(*v),
            _ => Err(self.cast_error("Bool")),
        }
    }

    /// Read as an integer
    pub fn as_int(&self) -> Result<i64, RuntimeError> {
        match self.value() {
            Value::Int(v) => Ok(*v),
            _ => Err(self.cast_error("Int")),
        }
    }

    /// Read as a float
    pub fn as_float(&self) -> Result<f64, RuntimeError> {
        match self.value() {
            Value::Float(v) => Ok(*v),
            _ => Err(self.cast_error("Float")),
        }
    }

    /// Read as a string
    pub fn as_str(&self) -> Result<&str, RuntimeError> {
        match self.value() {
            Value::String(v) => Ok(v),
            _ => Err(self.cast_error("String")),
        }
    }

    /// Read as an image
    pub fn as_image(&self) -> Result<&Image, RuntimeError> {
        match self.value() {
            Value::Image(v) => Ok(v),
            _ => Err(self.cast_error("Image")),
        }
    }

    /// Read as a transform
    pub fn as_transform(&self) -> Result<Transform, RuntimeError> {
        match self.value() {
            Value::Transform(v) => Ok(*v),
            _ => Err(self.cast_error("Transform")),
        }
    }

    /// Read as a curve
    pub fn as_curve(&self) -> Result<&Curve, RuntimeError> {
        match self.value() {
            Value::Curve(v) => Ok(v),
            _ => Err(self.cast_error("Curve")),
        }
    }

    /// Read as a closure
    pub fn as_closure(&self) -> Result<&Closure, RuntimeError> {
        match self.value() {
            Value::Closure(v) => Ok(v),
            _ => Err(self.cast_error("Closure")),
        }
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.value() == other.value()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Value::Closure(c) => write!(f, "<closure {} {}/{}>", c.name(), c.bound().len(), c.arity()),
            Value::Image(img) => write!(f, "<image {}x{}>", img.width(), img.height()),
            other => other.fmt(f),
        }
    }
}

impl From<bool> for Object {
    fn from(value: bool) -> Self {
        Self::bool(value)
    }
}

impl From<i64> for Object {
    fn from(value: i64) -> Self {
        Self::int(value)
    }
}

impl From<f64> for Object {
    fn from(value: f64) -> Self {
        Self::float(value)
    }
}
