// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

use std::{
    env,
    path::{
        Path,
        PathBuf,
    },
    str::FromStr,
};

use kdview::{
    config::{
        BuildConfig,
        Tessellation,
        HEIGHT,
        SAMPLES,
        WIDTH,
    },
    render::{
        self,
        RenderSettings,
    },
    MemoryDevice,
    Viewer,
};
use tracing::{
    info,
    Level,
};

#[derive(Debug)]
struct Args {
    input:    PathBuf,
    config:   BuildConfig,
    segments: Option<Tessellation>,
    output:   Option<PathBuf>,
    render:   RenderSettings,
    level:    Level,
}

fn print_usage(prog: &str) {
    println!("Usage: {prog} <scene.json|mesh.glb> [options]");
    println!();
    println!("Options:");
    println!("  --segments X Y       Tessellation of procedural shapes");
    println!("  --leaf N             Max triangles per k-d tree leaf (1-6)");
    println!("  --max-buffer BYTES   Max size of one uploaded buffer");
    println!("  --render FILE        Write a 16-bit PNG of the scene");
    println!("  --size W H           Image size (default {WIDTH}x{HEIGHT})");
    println!("  --samples N          Jittered samples per pixel (default {SAMPLES})");
    println!("  -v, --verbose        Debug output");
    println!("  -vv, --trace         Trace output");
    println!("  -q, --quiet          Warnings and errors only");
}

fn value<'a, T: FromStr>(
    args: &mut impl Iterator<Item = &'a String>,
    flag: &str,
) -> Result<T, String> {
    let raw = args
        .next()
        .ok_or_else(|| format!("{flag} expects a value"))?;
    raw.parse()
        .map_err(|_| format!("{flag}: invalid value '{raw}'"))
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut input = None;
    let mut config = BuildConfig::default();
    let mut segments = None;
    let mut output = None;
    let mut render = RenderSettings::default();
    let mut level = Level::INFO;

    let mut args = args.iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-v" | "--verbose" => level = Level::DEBUG,
            "-vv" | "--trace" => level = Level::TRACE,
            "-q" | "--quiet" => level = Level::WARN,
            "--segments" => {
                segments = Some(Tessellation::new(
                    value(&mut args, arg)?,
                    value(&mut args, arg)?,
                ));
            },
            "--leaf" => config.max_leaf_size = value(&mut args, arg)?,
            "--max-buffer" => config.max_buffer_size = value(&mut args, arg)?,
            "--render" => output = Some(PathBuf::from(value::<String>(&mut args, arg)?)),
            "--size" => {
                render.width = value(&mut args, arg)?;
                render.height = value(&mut args, arg)?;
            },
            "--samples" => render.samples = value(&mut args, arg)?,
            flag if flag.starts_with('-') => return Err(format!("Unknown option: {flag}")),
            path if input.is_none() => input = Some(PathBuf::from(path)),
            extra => return Err(format!("Unexpected argument: {extra}")),
        }
    }

    if render.width == 0 || render.height == 0 {
        return Err("Image size must be non-zero".to_owned());
    }

    Ok(Args {
        input: input.ok_or("Missing scene or mesh file")?,
        config,
        segments,
        output,
        render,
        level,
    })
}

fn is_mesh_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("glb") || ext.eq_ignore_ascii_case("gltf"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let argv = env::args().collect::<Vec<_>>();
    let prog = argv.first().map_or("kdview", String::as_str);
    if argv.iter().skip(1).any(|arg| arg == "-h" || arg == "--help") {
        print_usage(prog);
        return Ok(());
    }

    let args = match parse_args(argv.get(1..).unwrap_or_default()) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            print_usage(prog);
            std::process::exit(2);
        },
    };

    let fmt_subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_max_level(args.level)
        .finish();
    tracing::subscriber::set_global_default(fmt_subscriber)?;

    let mut viewer = Viewer::new(MemoryDevice::new(), args.config)?;
    if let Some(segments) = args.segments {
        viewer.set_segments(segments)?;
    }

    let begin_time = std::time::Instant::now();
    if is_mesh_file(&args.input) {
        viewer.load_mesh(&args.input)?;
    } else {
        viewer.load_scene_file(&args.input)?;
    }
    info!(elapsed_ms = begin_time.elapsed().as_millis(), "Scene built");

    if let (Some(scene), Some(gpu)) = (viewer.scene(), viewer.gpu()) {
        let bounds = scene.triangle_tree.root_bounds();
        println!("Instances:        {}", scene.instances.len());
        println!("Triangles:        {}", scene.triangles.len());
        println!("Object nodes:     {}", scene.object_tree.len());
        println!("Triangle nodes:   {}", scene.triangle_tree.len());
        println!("Root index:       {}", gpu.root);
        if !bounds.is_empty() {
            println!("Scene bounds:     {} .. {}", bounds.min, bounds.max);
        }
        println!(
            "Triangle chunks:  {} x {} records",
            gpu.triangles.chunk_count(),
            gpu.triangles.records_per_chunk()
        );
        println!(
            "Node chunks:      {} x {} records",
            gpu.nodes.chunk_count(),
            gpu.nodes.records_per_chunk()
        );
    }

    if let Some(output) = &args.output {
        let view = viewer
            .view()
            .ok_or("Device lost the scene buffers")?;
        let settings = RenderSettings {
            progress: args.level >= Level::INFO,
            ..args.render
        };
        let pixels = render::render(&view, &viewer.camera(), &viewer.light(), &settings);
        render::write_png(output, settings.width, settings.height, &pixels)?;
        info!(path = %output.display(), "Wrote image");
    }

    Ok(())
}
