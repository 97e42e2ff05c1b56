/// makefont: bake the printable ASCII range of a font into an atlas and
/// write it, with glyph metrics and kerning, as JSON.

use clap::Parser;
use libtext::atlas::{Depth, TextureAtlas};
use libtext::baked::BakedFont;
use libtext::config::Config;
use libtext::font::{FontOptions, RenderMode, TextureFont};
use std::error::Error;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "makefont", about = "Bake a font into a texture atlas")]
struct Args {
    /// Font file to bake.
    #[arg(short = 'f', long)]
    font: PathBuf,

    /// Output JSON file.
    #[arg(short = 'o', long)]
    output: PathBuf,

    /// Pixel size, at least 4.
    #[arg(short = 's', long, value_parser = parse_size)]
    size: f32,

    /// Name stored in the output; defaults to the font file stem.
    #[arg(short = 'a', long)]
    name: Option<String>,

    /// Width and height of the square atlas.
    #[arg(short = 't', long, default_value_t = 128)]
    texture: usize,

    /// normal, outline_edge, outline_positive, outline_negative or sdf.
    /// Defaults to the configured render mode.
    #[arg(short = 'r', long)]
    rendermode: Option<RenderMode>,

    /// Outline thickness in pixels, for the outline modes. Defaults to the
    /// configured thickness, or 1 when that is zero.
    #[arg(long)]
    thickness: Option<f32>,

    /// Bytes per atlas pixel: 1, 3 or 4. Defaults to the configured depth.
    #[arg(long, value_parser = parse_depth)]
    depth: Option<Depth>,
}

fn parse_size(s: &str) -> Result<f32, String> {
    let size: f32 = s.parse().map_err(|_| format!("invalid size {:?}", s))?;
    if size < 4.0 {
        return Err(format!("font size must be at least 4, got {}", size));
    }
    Ok(size)
}

fn parse_depth(s: &str) -> Result<Depth, String> {
    let value: u8 = s.parse().map_err(|_| format!("invalid depth {:?}", s))?;
    Depth::try_from(value)
}

/// Font options from `config` with the command line on top.
fn font_options(args: &Args, config: &Config) -> FontOptions {
    let mut options = config.font.options();
    if let Some(mode) = args.rendermode {
        options.rendermode = mode;
    }
    options.outline_thickness = match args.thickness {
        Some(t) => t,
        None if options.outline_thickness > 0.0 => options.outline_thickness,
        None => 1.0,
    };
    options
}

fn run(args: &Args, config: &Config) -> Result<(), Box<dyn Error>> {
    let depth = args.depth.unwrap_or(config.atlas.depth);
    let mut atlas = TextureAtlas::new(args.texture, args.texture, depth)?;
    let options = font_options(args, config);
    let mut font = TextureFont::from_file(&mut atlas, args.size, &args.font, &options)?;
    let cache = &config.font.cache;
    let missed = font.load_glyphs(&mut atlas, cache);

    let name = match &args.name {
        Some(name) => name.clone(),
        None => args
            .font
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "font".into()),
    };
    BakedFont::from_font(name, &font, &atlas).write(&args.output)?;

    println!("Font filename           : {}", args.font.display());
    println!("Font size               : {:.1}", args.size);
    println!("Number of glyphs        : {}", cache.chars().count());
    println!("Number of missed glyphs : {}", missed);
    println!(
        "Texture size            : {}x{}x{}",
        atlas.width(),
        atlas.height(),
        atlas.depth().bytes()
    );
    println!("Texture occupancy       : {:.2}%", 100.0 * atlas.occupancy());
    println!("Output                  : {}", args.output.display());
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    let config = Config::load();
    if let Err(e) = run(&args, &config) {
        eprintln!("makefont: {}", e);
        std::process::exit(1);
    }
}
