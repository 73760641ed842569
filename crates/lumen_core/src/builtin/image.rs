// SPDX-License-Identifier: MIT OR Apache-2.0
//! Image and transform nodes.

use super::declare_with;
use crate::catalog::{Catalog, CatalogError, NodeDeclaration, NodeDefinition};
use crate::closure::{NativeFn, Reduced};
use crate::eval::{Machine, RuntimeError};
use crate::frame::{Image, Transform};
use crate::object::Object;
use crate::term::Term;
use crate::types::Type;

/// Largest edge length accepted by `Std.Image.Solid`
pub const MAX_IMAGE_SIZE: i64 = 4096;

fn solid(args: &[Term], m: &mut Machine) -> Result<Reduced, RuntimeError> {
    let red = m.force_float(&args[0])? as f32;
    let green = m.force_float(&args[1])? as f32;
    let blue = m.force_float(&args[2])? as f32;
    let size = m.force_int(&args[3])?;
    if !(0..=MAX_IMAGE_SIZE).contains(&size) {
        return Ok(Reduced::Value(Object::exception(format!(
            "image size {size} outside 0..={MAX_IMAGE_SIZE}"
        ))));
    }
    let size = size as u32;
    Ok(Reduced::Value(Object::image(Image::filled(size, size, [red, green, blue, 1.0]))))
}

fn opacity(args: &[Term], m: &mut Machine) -> Result<Reduced, RuntimeError> {
    let image = m.force(&args[0])?;
    let k = m.force_float(&args[1])?.clamp(0.0, 1.0) as f32;
    let out = image.as_image()?.map(|[r, g, b, a]| [r * k, g * k, b * k, a * k]);
    Ok(Reduced::Value(Object::image(out)))
}

fn over(args: &[Term], m: &mut Machine) -> Result<Reduced, RuntimeError> {
    let foreground = m.force(&args[0])?;
    let background = m.force(&args[1])?;
    let out = foreground.as_image()?.over(background.as_image()?);
    Ok(Reduced::Value(Object::image(out)))
}

fn apply_transform(args: &[Term], m: &mut Machine) -> Result<Reduced, RuntimeError> {
    let image = m.force(&args[0])?;
    let transform = m.force_transform(&args[1])?;
    let source = image.as_image()?;
    let out = match transform.inverse() {
        // Nearest neighbour: sample the source at the inverse-mapped pixel centre
        Some(inverse) => Image::from_fn(source.width(), source.height(), |x, y| {
            let (sx, sy) = inverse.apply(x as f64 + 0.5, y as f64 + 0.5);
            source
                .pixel(sx.floor() as i64, sy.floor() as i64)
                .unwrap_or([0.0; 4])
        }),
        None => Image::transparent(source.width(), source.height()),
    };
    Ok(Reduced::Value(Object::image(out)))
}

fn translate(args: &[Term], m: &mut Machine) -> Result<Reduced, RuntimeError> {
    let x = m.force_float(&args[0])?;
    let y = m.force_float(&args[1])?;
    Ok(Reduced::Value(Object::transform(Transform::translate(x, y))))
}

/// Float -> Float -> Float -> Int -> Image
pub const SOLID: NativeFn = NativeFn {
    name: "solid",
    arity: 4,
    signature: || Type::function([Type::float(), Type::float(), Type::float(), Type::int()], Type::image()),
    body: solid,
};

/// Image -> Float -> Image
pub const OPACITY: NativeFn = NativeFn {
    name: "opacity",
    arity: 2,
    signature: || Type::function([Type::image(), Type::float()], Type::image()),
    body: opacity,
};

/// Image -> Image -> Image
pub const OVER: NativeFn = NativeFn {
    name: "over",
    arity: 2,
    signature: || Type::function([Type::image(), Type::image()], Type::image()),
    body: over,
};

/// Image -> Transform -> Image
pub const APPLY_TRANSFORM: NativeFn = NativeFn {
    name: "apply_transform",
    arity: 2,
    signature: || Type::function([Type::image(), Type::transform()], Type::image()),
    body: apply_transform,
};

/// Float -> Float -> Transform
pub const TRANSLATE: NativeFn = NativeFn {
    name: "translate",
    arity: 2,
    signature: || Type::function([Type::float(), Type::float()], Type::transform()),
    body: translate,
};

/// Declare and define the image and transform nodes
pub fn register(catalog: &mut Catalog, backend: &str) -> Result<(), CatalogError> {
    // ========================================================================
    // Generators
    // ========================================================================

    declare_with(
        catalog,
        backend,
        NodeDeclaration::new("Std.Image.Solid")
            .input_or("red", || Object::float(1.0))
            .input_or("green", || Object::float(1.0))
            .input_or("blue", || Object::float(1.0))
            .input_or("size", || Object::int(16))
            .output("image", (SOLID.signature)())
            .description("Opaque square of one color"),
        "image",
        &[SOLID],
    )?;

    // ========================================================================
    // Compositing
    // ========================================================================

    declare_with(
        catalog,
        backend,
        NodeDeclaration::new("Std.Image.Opacity")
            .input("image")
            .input_or("opacity", || Object::float(1.0))
            .output("image", (OPACITY.signature)())
            .description("Scale the alpha of an image"),
        "image",
        &[OPACITY],
    )?;

    declare_with(
        catalog,
        backend,
        NodeDeclaration::new("Std.Image.Over")
            .input("foreground")
            .input("background")
            .output("image", (OVER.signature)())
            .description("Composite foreground over background"),
        "image",
        &[OVER],
    )?;

    declare_with(
        catalog,
        backend,
        NodeDeclaration::new("Std.Image.ApplyTransform")
            .input("image")
            .input_or("transform", || Object::transform(Transform::IDENTITY))
            .output("image", (APPLY_TRANSFORM.signature)())
            .description("Resample an image through a transform"),
        "image",
        &[APPLY_TRANSFORM],
    )?;

    // ========================================================================
    // Transforms
    // ========================================================================

    declare_with(
        catalog,
        backend,
        NodeDeclaration::new("Std.Transform.Translate")
            .input_or("x", || Object::float(0.0))
            .input_or("y", || Object::float(0.0))
            .output("transform", (TRANSLATE.signature)())
            .description("Translation by x and y"),
        "transform",
        &[TRANSLATE],
    )?;

    catalog.declare(
        NodeDeclaration::new("Std.Transform.Identity")
            .output("transform", Type::transform())
            .description("The identity transform"),
    )?;
    catalog.define(NodeDefinition::new(
        "Std.Transform.Identity",
        "transform",
        backend,
        Type::transform(),
        || Object::transform(Transform::IDENTITY),
    ))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::Demand;

    fn run(term: Term) -> Object {
        Machine::new(Demand::default()).eval(&term).unwrap()
    }

    fn solid_term(red: f64, size: i64) -> Term {
        Term::apply_all(
            SOLID.instance().into(),
            [
                Term::value(Object::float(red)),
                Term::value(Object::float(0.0)),
                Term::value(Object::float(0.0)),
                Term::value(Object::int(size)),
            ],
        )
    }

    #[test]
    fn test_solid_and_opacity() {
        let half = Term::apply_all(
            OPACITY.instance().into(),
            [solid_term(1.0, 2), Term::value(Object::float(0.5))],
        );
        let out = run(half);
        let image = out.as_image().unwrap();
        assert_eq!(image.width(), 2);
        assert_eq!(image.pixel(1, 1), Some([0.5, 0.0, 0.0, 0.5]));
    }

    #[test]
    fn test_translate_moves_pixels() {
        let mut m = Machine::new(Demand::default());
        let source = Image::from_fn(4, 1, |x, _| if x == 0 { [1.0; 4] } else { [0.0; 4] });
        let term = Term::apply_all(
            APPLY_TRANSFORM.instance().into(),
            [
                Term::value(Object::image(source)),
                Term::apply_all(
                    TRANSLATE.instance().into(),
                    [Term::value(Object::float(2.0)), Term::value(Object::float(0.0))],
                ),
            ],
        );
        let out = m.eval(&term).unwrap();
        let image = out.as_image().unwrap();
        assert_eq!(image.pixel(0, 0), Some([0.0; 4]));
        assert_eq!(image.pixel(2, 0), Some([1.0; 4]));
    }

    #[test]
    fn test_negative_size_raises() {
        let err = Machine::new(Demand::default()).eval(&solid_term(1.0, -1)).unwrap_err();
        assert!(matches!(err, RuntimeError::Exception(_)));
    }
}
