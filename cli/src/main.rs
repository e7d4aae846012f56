mod host;
mod test_runner;
mod values;

use std::path::Path;
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::Diagnostic;
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

use blockform::Catalog;
use blockform::block::BlockDefinition;
use blockform::layout::{Group, LayoutNode};
use blockform::value::FieldValues;
use composer::{Composer, FormNode, FormSection, FormTree};

#[derive(Parser)]
#[command(name = "blockform", version, about = "Block form layout composer")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// Raise the log level (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a declaration file and resolve every block layout
    Check(CheckArgs),

    /// Print resolved layout trees
    Show(ShowArgs),

    /// Render a block form with submitted values
    Render(RenderArgs),

    /// Run .test.toml test files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct CheckArgs {
    /// TOML block declaration file
    file: String,
}

#[derive(clap::Args)]
struct ShowArgs {
    /// TOML block declaration file
    file: String,

    /// Only show this block (default: all blocks)
    #[arg(short, long)]
    block: Option<String>,
}

#[derive(clap::Args)]
struct RenderArgs {
    /// TOML block declaration file
    file: String,

    /// Block to render
    #[arg(short, long)]
    block: String,

    /// TOML file of submitted field values
    #[arg(long)]
    values: Option<String>,

    /// Print HTML instead of the outline
    #[arg(long)]
    html: bool,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.toml file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let color_choice = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    match cli.command {
        Command::Check(args) => do_check(args, color_choice),
        Command::Show(args) => do_show(args, color_choice),
        Command::Render(args) => do_render(args, color_choice),
        Command::Test(args) => {
            let path = Path::new(&args.path);
            if args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &args.category);
            process::exit(exit_code);
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

struct Loaded {
    files: SimpleFiles<String, String>,
    catalog: Catalog,
}

/// Read and parse a declaration file, exiting with diagnostics on failure.
fn load(file: &str, color_choice: ColorChoice) -> Loaded {
    let source = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", file, e);
            process::exit(1);
        }
    };

    let mut files = SimpleFiles::new();
    let file_id = files.add(file.to_string(), source.clone());

    match blockform::parser::Parser::new(source, file_id).parse() {
        Ok(catalog) => Loaded { files, catalog },
        Err(errors) => {
            let diagnostics: Vec<_> = errors.iter().map(|e| e.to_diagnostic()).collect();
            emit(&files, &diagnostics, color_choice);
            process::exit(1);
        }
    }
}

/// Resolve every layout, exiting with diagnostics on failure.
fn compose(loaded: &Loaded, color_choice: ColorChoice) -> Composer<'_> {
    match Composer::new(&loaded.catalog) {
        Ok(composer) => composer,
        Err(errors) => {
            let file_id = loaded.catalog.source_id;
            let diagnostics: Vec<_> = errors.iter().map(|e| e.to_diagnostic(file_id)).collect();
            emit(&loaded.files, &diagnostics, color_choice);
            process::exit(1);
        }
    }
}

fn emit(
    files: &SimpleFiles<String, String>,
    diagnostics: &[Diagnostic<usize>],
    color_choice: ColorChoice,
) {
    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();
    for diagnostic in diagnostics {
        let _ = term::emit_to_write_style(&mut writer.lock(), &config, files, diagnostic);
    }
}

fn definition_or_exit<'a>(composer: &'a Composer<'_>, name: &str) -> &'a BlockDefinition {
    match composer.definition(name) {
        Some(definition) => definition,
        None => {
            eprintln!(
                "error: unknown block '{}' (available: {})",
                name,
                composer.catalog().block_names().join(", ")
            );
            process::exit(1);
        }
    }
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

fn do_check(args: CheckArgs, color_choice: ColorChoice) {
    let loaded = load(&args.file, color_choice);
    let composer = compose(&loaded, color_choice);
    eprintln!(
        "ok: {} declares {} block(s) with valid layouts",
        args.file,
        composer.catalog().blocks.len()
    );
}

fn do_show(args: ShowArgs, color_choice: ColorChoice) {
    let loaded = load(&args.file, color_choice);
    let composer = compose(&loaded, color_choice);

    let names: Vec<&str> = match &args.block {
        Some(name) => vec![definition_or_exit(&composer, name).name.as_str()],
        None => composer.catalog().block_names(),
    };

    for (i, name) in names.iter().enumerate() {
        if i > 0 {
            println!();
        }
        let definition = definition_or_exit(&composer, name);
        let Some(layout) = composer.layout(name) else {
            continue;
        };
        print!("{}", definition.name);
        if let Some(icon) = &definition.icon {
            print!(" (icon: {})", icon);
        }
        if let Some(template) = &definition.form_template {
            print!(" [template: {}]", template);
        }
        println!();
        print_group(definition, &layout.to_root(), 1);
    }
}

fn print_group(definition: &BlockDefinition, group: &Group, indent: usize) {
    for node in &group.children {
        print_node(definition, node, indent);
    }
    if !group.settings.is_empty() {
        println!("{}settings:", "  ".repeat(indent));
        for node in &group.settings {
            print_node(definition, node, indent + 1);
        }
    }
}

fn print_node(definition: &BlockDefinition, node: &LayoutNode, indent: usize) {
    let pad = "  ".repeat(indent);
    match node {
        LayoutNode::Field(field) => match definition.field(&field.name) {
            Some(f) => println!(
                "{}{} [{}{}]",
                pad,
                f.name,
                f.kind,
                if f.required { ", required" } else { "" }
            ),
            None => println!("{}{} [?]", pad, field.name),
        },
        LayoutNode::Group(group) => {
            let mut line = format!("{}# {}", pad, group.heading.as_deref().unwrap_or("(group)"));
            if group.is_collapsed() {
                line.push_str(" (collapsed)");
            }
            if let Some(format) = &group.label_format {
                line.push_str(&format!(" label: \"{}\"", format));
            }
            for (key, value) in group.attrs.iter() {
                line.push_str(&format!(" {}={}", key, value));
            }
            println!("{}", line);
            print_group(definition, group, indent + 1);
        }
    }
}

fn do_render(args: RenderArgs, color_choice: ColorChoice) {
    let loaded = load(&args.file, color_choice);
    let composer = compose(&loaded, color_choice);
    definition_or_exit(&composer, &args.block);

    let values = match &args.values {
        Some(path) => match values::load(path) {
            Ok(values) => values,
            Err(e) => {
                eprintln!("error: {}", e);
                process::exit(1);
            }
        },
        None => FieldValues::new(),
    };

    let errors = host::validate(&composer, &args.block, &values);
    let tree = match composer.render_block(&args.block, &values, &errors) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    if args.html {
        print!("{}", composer::to_html(&tree));
    } else {
        print_form(&tree);
    }
    if tree.error_count() > 0 {
        eprintln!("{} field error(s)", tree.error_count());
    }
}

fn print_form(tree: &FormTree) {
    println!("{}", tree.block);
    for unplaced in &tree.unplaced_errors {
        for message in &unplaced.messages {
            println!("  ! {}: {}", unplaced.field, message);
        }
    }
    print_section(&tree.root, 1);
}

fn print_section(section: &FormSection, indent: usize) {
    for node in &section.children {
        print_form_node(node, indent);
    }
    if !section.settings.is_empty() {
        let marker = if section.settings_open {
            format!(" ({} error(s), open)", section.settings_error_count)
        } else {
            String::new()
        };
        println!("{}settings:{}", "  ".repeat(indent), marker);
        for node in &section.settings {
            print_form_node(node, indent + 1);
        }
    }
}

fn print_form_node(node: &FormNode, indent: usize) {
    let pad = "  ".repeat(indent);
    match node {
        FormNode::Section(section) => {
            let mut line = format!("{}# {}", pad, section.title().unwrap_or("(group)"));
            match (section.collapsed, section.open) {
                (true, true) => line.push_str(" (collapsed, opened)"),
                (true, false) => line.push_str(" (collapsed)"),
                _ => {}
            }
            if section.has_errors() {
                line.push_str(&format!(" [{} error(s)]", section.error_count));
            }
            println!("{}", line);
            print_section(section, indent + 1);
        }
        FormNode::Field(widget) => {
            println!("{}{} #{} = {:?}", pad, widget.name, widget.id, widget.value.to_string());
            for error in &widget.errors {
                println!("{}  ! {}", pad, error);
            }
            if let Some(nested) = &widget.nested {
                print_section(&nested.root, indent + 1);
            }
        }
    }
}
