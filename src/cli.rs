use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, ValueEnum};

use crate::config::load_config;
use crate::events::EventBus;
use crate::render::{render_svg, write_output_svg, Renderer};
use crate::spec::Spec;
use crate::theme::ThemeResolver;
use crate::viewport::ViewportManager;

#[derive(Parser, Debug)]
#[command(name = "tmapr", version, about = "Thinking-map diagram renderer")]
pub struct Args {
    /// Input spec file (.json) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file (svg/png). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (layout, theme, viewport sections)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Width
    #[arg(short = 'w', long = "width", default_value_t = 1200.0)]
    pub width: f32,

    /// Height
    #[arg(short = 'H', long = "height", default_value_t = 800.0)]
    pub height: f32,

    /// Fit mode for the emitted viewBox
    #[arg(long = "fit", value_enum, default_value = "export")]
    pub fit: Fit,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum Fit {
    /// Fixed pixel padding, exporter default.
    Export,
    /// Ratio padding over the whole canvas.
    Full,
    /// Ratio padding with a properties panel strip reserved.
    Panel,
}

pub fn run() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    config.render.width = args.width;
    config.render.height = args.height;

    let input = read_input(args.input.as_deref())?;
    let mut spec = Spec::from_json(&input)?;

    let mut renderer = Renderer::new(config.clone());
    let mut bus = EventBus::new();
    let output = renderer.render(&mut spec, &mut bus)?;

    let svg = match args.fit {
        Fit::Export => output.svg,
        Fit::Full | Fit::Panel => {
            let mut viewport = ViewportManager::new(config.viewport.clone(), args.width, args.height);
            match args.fit {
                Fit::Full => viewport.fit_to_full_canvas(&output.layout.bounds, &mut bus),
                _ => {
                    viewport.open_panel(crate::viewport::Panel::Properties);
                    viewport.fit_to_canvas_with_panel(&output.layout.bounds, &mut bus);
                }
            }
            let theme = ThemeResolver::new().resolve(
                spec.diagram_type(),
                &config.render.font_family,
                &config.theme,
                spec.style.as_ref(),
            )?;
            render_svg(
                &output.layout,
                &theme,
                &config,
                Some(viewport.view_box()),
                None,
            )
        }
    };

    match args.output_format {
        OutputFormat::Svg => {
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let path = ensure_output(&args.output, "png")?;
            write_png(&svg, &path, &config)?;
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
fn write_png(svg: &str, path: &Path, config: &crate::config::Config) -> Result<()> {
    crate::render::write_output_png(svg, path, config)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _path: &Path, _config: &crate::config::Config) -> Result<()> {
    Err(anyhow::anyhow!(
        "PNG output requires building with the `png` feature"
    ))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path == Path::new("-") {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            return Ok(buf);
        }
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}
