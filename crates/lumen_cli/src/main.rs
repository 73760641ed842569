// SPDX-License-Identifier: MIT OR Apache-2.0
//! Lumen - node graph compositor, command line front end
//!
//! Builds a small compositing graph, compiles it and renders a few frames:
//! - A red square faded in by an animated opacity
//! - Slid across the frame by an animated translation
//! - Composited over a blue background
//!
//! Usage: `lumen [config.ron]`. Without a path the default configuration is
//! used. Set `RUST_LOG` to adjust logging.

use lumen_core::{Compiler, CompilerConfig, Demand, Object, OutputContract};
use lumen_curve::{Curve, Keyframe};
use lumen_graph::{Graph, NodeId, PortId, PortValue};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lumen_core=debug,lumen=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Lumen v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run() {
        tracing::error!("Lumen failed: {e}");
        std::process::exit(1);
    }
}

fn run() -> CliResult<()> {
    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => {
            tracing::info!("Loading config from {:?}", path);
            CompilerConfig::load(&path)?
        }
        None => CompilerConfig::default(),
    };
    if config.output != OutputContract::Image {
        tracing::warn!(output = ?config.output, "Demo graph produces an image");
    }

    let compiler = Compiler::with_std(config)?;
    let (graph, output) = demo_graph(&compiler)?;

    let report = compiler.compile(&graph, output);
    for diagnostic in &report.diagnostics {
        println!("error: {diagnostic}");
    }
    if !report.swapped {
        return Err(format!("{} compile error(s)", report.diagnostics.len()).into());
    }

    for time in [0.0, 0.5, 1.0, 2.0] {
        match compiler.execute(Demand::at(time)) {
            Some(Ok(frame)) => println!("t={time:<4} {}", describe(&frame)),
            Some(Err(err)) => println!("t={time:<4} frame failed: {err}"),
            None => return Err("No executable".into()),
        }
    }
    Ok(())
}

/// Solid -> Opacity -> ApplyTransform(Translate) -> Over(Solid)
fn demo_graph(compiler: &Compiler) -> CliResult<(Graph, PortId)> {
    let catalog = compiler.catalog();
    let mut graph = Graph::new("demo");

    let fade = Curve::from_keyframes([Keyframe::new(0.0, 0.0), Keyframe::new(1.0, 1.0)])?;
    let slide = Curve::from_keyframes([Keyframe::new(0.0, 0.0), Keyframe::new(2.0, 16.0)])?;

    let red = catalog
        .create_node("Std.Image.Solid")?
        .with_name("Red")
        .with_default("green", PortValue::Float(0.0))
        .with_default("blue", PortValue::Float(0.0))
        .with_default("size", PortValue::Int(32));
    let opacity = catalog
        .create_node("Std.Image.Opacity")?
        .with_default("opacity", PortValue::Curve(fade));
    let translate = catalog
        .create_node("Std.Transform.Translate")?
        .with_default("x", PortValue::Curve(slide));
    let moved = catalog.create_node("Std.Image.ApplyTransform")?;
    let background = catalog
        .create_node("Std.Image.Solid")?
        .with_name("Blue")
        .with_default("red", PortValue::Float(0.0))
        .with_default("green", PortValue::Float(0.0))
        .with_default("size", PortValue::Int(32));
    let over = catalog.create_node("Std.Image.Over")?;

    let output = over.outputs[0].id;
    let red = graph.add_node(red);
    let opacity = graph.add_node(opacity);
    let translate = graph.add_node(translate);
    let moved = graph.add_node(moved);
    let background = graph.add_node(background);
    let over = graph.add_node(over);

    let link = |graph: &mut Graph, from: NodeId, from_port: &str, to: NodeId, to_port: &str| -> CliResult<()> {
        let source = graph
            .node(from)
            .and_then(|n| n.output_named(from_port))
            .map(|p| p.id)
            .ok_or_else(|| format!("No output {from_port}"))?;
        let target = graph
            .node(to)
            .and_then(|n| n.input_named(to_port))
            .map(|p| p.id)
            .ok_or_else(|| format!("No input {to_port}"))?;
        graph.connect(from, source, to, target)?;
        Ok(())
    };

    link(&mut graph, red, "image", opacity, "image")?;
    link(&mut graph, opacity, "image", moved, "image")?;
    link(&mut graph, translate, "transform", moved, "transform")?;
    link(&mut graph, moved, "image", over, "foreground")?;
    link(&mut graph, background, "image", over, "background")?;

    Ok((graph, output))
}

fn describe(frame: &Object) -> String {
    match frame.as_image() {
        Ok(image) => {
            let centre = image.pixel(i64::from(image.width() / 2), i64::from(image.height() / 2));
            format!(
                "{}x{} image, centre pixel {:?}",
                image.width(),
                image.height(),
                centre.unwrap_or_default()
            )
        }
        Err(_) => format!("{frame:?}"),
    }
}
