//! djvu-inspect: print the structure of a DjVu document.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use djvu_x::core::{dump, Engine, Hyperlink, OutlineEntry};
use djvu_x::{
    Context, ContextOptions, DjvuResult, Document, OpenOptions, Page, TextDetail, WaitOptions,
};
use tracing_subscriber::EnvFilter;

/// DjVu Structure Inspector
#[derive(Parser, Debug)]
#[command(name = "djvu-inspect", version, about)]
struct Args {
    /// Document to inspect
    file: PathBuf,

    /// Show document information (default when nothing else is selected)
    #[arg(long)]
    info: bool,

    /// Show page sizes, resolution and rotation
    #[arg(long)]
    pages: bool,

    /// Extract hidden text down to this detail (page, column, region, para,
    /// line, word, char)
    #[arg(long, value_name = "DETAIL")]
    text: Option<TextDetail>,

    /// Show document and page annotations
    #[arg(long)]
    annotations: bool,

    /// Show the outline (bookmarks)
    #[arg(long)]
    outline: bool,

    /// Show the chunk structure, like djvudump
    #[arg(long)]
    structure: bool,

    /// Print the chunk structure as JSON (implies --structure)
    #[arg(long)]
    json: bool,

    /// Print raw expressions instead of decoded views
    #[arg(long)]
    dump: bool,

    /// Restrict page sections to one page, 1-based
    #[arg(long, value_name = "N")]
    page: Option<usize>,

    /// Give up on any single decode after this many milliseconds
    #[arg(long, value_name = "MS")]
    timeout: Option<u64>,

    /// Log engine activity (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn show_info(&self) -> bool {
        self.info
            || !(self.pages || self.text.is_some() || self.annotations || self.outline || self.show_structure())
    }

    fn show_structure(&self) -> bool {
        self.structure || self.json
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let Some(engine) = engine() else {
        eprintln!("Error: djvu-inspect was built without the `djvulibre` feature");
        eprintln!("Rebuild with `--features djvulibre` to open documents.");
        process::exit(2);
    };

    if let Err(err) = inspect(engine, &args) {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "djvu_x=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "djvulibre")]
fn engine() -> Option<&'static dyn Engine> {
    Some(djvu_x::NativeEngine::get())
}

#[cfg(not(feature = "djvulibre"))]
fn engine() -> Option<&'static dyn Engine> {
    None
}

fn inspect(engine: &dyn Engine, args: &Args) -> DjvuResult<()> {
    let context = Context::with_options(engine, &ContextOptions::default().with_name("djvu-inspect"))?;

    let mut wait = WaitOptions::default();
    if let Some(ms) = args.timeout {
        wait = wait.with_timeout(Duration::from_millis(ms));
    }
    let document = Document::open_with(&context, &args.file, &OpenOptions::default().with_wait(wait))?;

    println!("╔═══════════════════════════════════════════════════════════╗");
    println!("║           DjVu Structure Inspector                        ║");
    println!("╚═══════════════════════════════════════════════════════════╝");
    println!("\nFile: {}\n", args.file.display());

    let pages = selected_pages(&document, args.page)?;

    if args.show_info() {
        println!("═══════════════ BASIC INFORMATION ═══════════════");
        print_info(engine, &document)?;
        println!();
    }

    if args.pages {
        println!("═══════════════ PAGES ═══════════════");
        for &index in &pages {
            print_page_info(&document.page(index)?)?;
        }
        println!();
    }

    if args.show_structure() {
        println!("═══════════════ STRUCTURE ═══════════════");
        match document.dump(args.json)? {
            Some(text) => println!("{}", text.trim_end()),
            None => println!("(not available)"),
        }
        println!();
    }

    if args.outline {
        println!("═══════════════ DOCUMENT OUTLINE ═══════════════");
        print_outline(&document, args.dump)?;
        println!();
    }

    if args.annotations {
        println!("═══════════════ ANNOTATIONS ═══════════════");
        print_annotations(&document, &pages, args.dump)?;
        println!();
    }

    if let Some(detail) = args.text {
        println!("═══════════════ TEXT ({}) ═══════════════", detail);
        print_text(&document, &pages, detail, args.dump)?;
        println!();
    }

    Ok(())
}

/// 0-based indices of the pages page sections cover.
fn selected_pages(document: &Document<'_>, page: Option<usize>) -> DjvuResult<Vec<usize>> {
    let count = document.page_count()?;
    match page {
        None => Ok((0..count).collect()),
        Some(number) if number >= 1 && number <= count => Ok(vec![number - 1]),
        Some(number) => Err(djvu_x::DjvuError::IndexOutOfRange {
            index: number.saturating_sub(1),
            length: count,
        }),
    }
}

fn print_info(engine: &dyn Engine, document: &Document<'_>) -> DjvuResult<()> {
    println!("Engine: {}", engine.version());
    println!("Document Type: {:?}", document.document_type()?);
    println!("Page Count: {}", document.page_count()?);
    println!("File Count: {}", document.file_count()?);

    if let Ok(metadata) = std::fs::metadata(document.path()) {
        println!("File Size: {}", format_size(metadata.len()));
    }

    if let Some(anno) = document.annotations(true)? {
        let metadata = anno.metadata()?;
        if !metadata.is_empty() {
            println!("\nMetadata:");
            for (key, value) in metadata {
                println!("  {}: {}", key, value);
            }
        }
    }
    Ok(())
}

fn format_size(size: u64) -> String {
    if size < 1024 {
        format!("{} B", size)
    } else if size < 1024 * 1024 {
        format!("{:.2} KB", size as f64 / 1024.0)
    } else {
        format!("{:.2} MB", size as f64 / (1024.0 * 1024.0))
    }
}

fn print_page_info(page: &Page<'_>) -> DjvuResult<()> {
    let dpi = page.resolution()?;
    let (width, height) = (page.width()?, page.height()?);
    let inches = |pixels: i32| if dpi > 0 { pixels as f64 / dpi as f64 } else { 0.0 };

    println!(
        "Page {}: {} x {} px at {} dpi ({:.2} x {:.2} in), {:?}, rotated {}°",
        page.index() + 1,
        width,
        height,
        dpi,
        inches(width),
        inches(height),
        page.page_type()?,
        page.rotation()?.degrees()
    );
    Ok(())
}

fn print_outline(document: &Document<'_>, raw: bool) -> DjvuResult<()> {
    if raw {
        match document.outline_expr()? {
            Some(expr) => println!("{}", dump(&expr)),
            None => println!("No outline"),
        }
        return Ok(());
    }

    let outline = document.outline()?;
    if outline.is_empty() {
        println!("No outline");
    }
    for entry in &outline {
        print_outline_entry(entry, 0);
    }
    Ok(())
}

fn print_outline_entry(entry: &OutlineEntry, depth: usize) {
    let indent = "  ".repeat(depth);
    match entry.page_number() {
        Some(page) => println!("{}{} (page {})", indent, entry.title, page),
        None => println!("{}{} ({})", indent, entry.title, entry.url),
    }
    for child in &entry.children {
        print_outline_entry(child, depth + 1);
    }
}

fn print_annotations(document: &Document<'_>, pages: &[usize], raw: bool) -> DjvuResult<()> {
    println!("Document:");
    match document.annotations(false)? {
        Some(anno) if raw => println!("{}", dump(&anno.expr())),
        Some(anno) => {
            for (label, value) in [
                ("Background", anno.background()?),
                ("Zoom", anno.zoom()?),
                ("Mode", anno.mode()?),
                ("Horizontal align", anno.horizontal_align()?),
                ("Vertical align", anno.vertical_align()?),
            ] {
                if let Some(value) = value {
                    println!("  {}: {}", label, value);
                }
            }
        }
        None => println!("  (none)"),
    }

    for &index in pages {
        let Some(anno) = document.page_annotations(index)? else {
            continue;
        };
        println!("Page {}:", index + 1);
        if raw {
            println!("{}", dump(&anno.expr()));
            continue;
        }
        for link in anno.hyperlinks()? {
            print_hyperlink(&link);
        }
    }
    Ok(())
}

fn print_hyperlink(link: &Hyperlink) {
    let target = link.target.as_deref().map(|t| format!(" [{}]", t)).unwrap_or_default();
    println!(
        "  {:?} {:?} -> {}{} {}",
        link.shape.kind, link.shape.coords, link.url, target, link.comment
    );
}

fn print_text(document: &Document<'_>, pages: &[usize], detail: TextDetail, raw: bool) -> DjvuResult<()> {
    for &index in pages {
        let page = document.page(index)?;
        println!("--- Page {} ---", index + 1);
        let text = if raw {
            page.text_dump(detail)?
        } else {
            page.text(detail)?.map(|zone| zone.text())
        };
        println!("{}", text.as_deref().unwrap_or("(no text)"));
    }
    Ok(())
}
