use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use foxsave::{Category, Cipher, Dictionary, Layout, Overlay, Save, SaveBuilder, SlotKind};

#[derive(Parser, Debug)]
struct ActionCrypt {
    /// Input save file
    #[arg(index = 1)]
    input: PathBuf,

    /// Output file. Defaults to the input path with a suffix appended
    #[arg(index = 2)]
    output: Option<PathBuf>,

    /// Save category (game, config, personal, graphics, mgo). Inferred from the file name if omitted
    #[arg(short, long)]
    category: Option<Category>,
}

#[derive(Parser, Debug)]
struct ActionDump {
    /// Input save file
    #[arg(index = 1)]
    input: PathBuf,

    /// Save category (game, config, personal, graphics, mgo). Inferred from the file name if omitted
    #[arg(short, long)]
    category: Option<Category>,

    /// Block layout (legacy, headerrelative). Defaults to the category's layout
    #[arg(short, long)]
    layout: Option<Layout>,

    /// Dictionary of "<hash> <name>" lines
    #[arg(short, long)]
    dict: Option<PathBuf>,

    /// Input is already decrypted
    #[arg(long, default_value = "false")]
    decrypted: bool,

    /// Parse even if the checksum does not match
    #[arg(long, default_value = "false")]
    no_verify: bool,

    /// Only print variable names
    #[arg(short, long, default_value = "false")]
    keys_only: bool,
}

#[derive(Parser, Debug)]
struct ActionScan {
    /// Input save file
    #[arg(index = 1)]
    input: PathBuf,

    /// Dictionary of "<hash> <name>" lines
    #[arg(short, long)]
    dict: PathBuf,

    /// Save category (game, config, personal, graphics, mgo). Inferred from the file name if omitted
    #[arg(short, long)]
    category: Option<Category>,

    /// Input is already decrypted
    #[arg(long, default_value = "false")]
    decrypted: bool,
}

#[derive(Parser, Debug)]
struct ActionRewrite {
    /// Input save file
    #[arg(index = 1)]
    input: PathBuf,

    /// Output save file
    #[arg(index = 2)]
    output: PathBuf,

    /// Save category (game, config, personal, graphics, mgo). Inferred from the file name if omitted
    #[arg(short, long)]
    category: Option<Category>,

    /// Block layout (legacy, headerrelative). Defaults to the category's layout
    #[arg(short, long)]
    layout: Option<Layout>,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Decrypt a save file
    Decrypt(ActionCrypt),
    /// Encrypt a decrypted save file
    Encrypt(ActionCrypt),
    /// Print the variables of a save file
    Dump(ActionDump),
    /// Search a save file for known hashes without parsing its layout
    Scan(ActionScan),
    /// Decode and re-encode a save file, recomputing its checksum
    Rewrite(ActionRewrite),
}

#[derive(Parser, Debug)]
#[command(author, version)]
struct Args {
    /// Verbose
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    action: Action,
}

fn main() -> Result<(), foxsave::Error> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match args.action {
        Action::Decrypt(args) => crypt(args, true),
        Action::Encrypt(args) => crypt(args, false),
        Action::Dump(args) => dump(args),
        Action::Scan(args) => scan(args),
        Action::Rewrite(args) => rewrite(args),
    }
}

fn category(explicit: Option<Category>, input: &Path) -> Result<Category, foxsave::Error> {
    explicit
        .or_else(|| {
            input
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(Category::from_file_name)
        })
        .ok_or(foxsave::Error::Other(
            "cannot tell the save category from the file name, pass --category",
        ))
}

fn dictionary(path: Option<&Path>) -> Result<Dictionary, foxsave::Error> {
    let Some(path) = path else {
        log::warn!("no dictionary given, variable names will not be resolved");
        return Ok(Dictionary::new());
    };
    let dictionary = Dictionary::from_hashed_list(&fs::read_to_string(path)?)?;
    log::debug!("loaded {} names from {}", dictionary.len(), path.display());
    Ok(dictionary)
}

/// Read `input`, decrypting it unless it already is
fn read(input: &Path, category: Option<Category>) -> Result<Vec<u8>, foxsave::Error> {
    let mut data = fs::read(input)?;
    if let Some(category) = category {
        Cipher::for_category(category).apply(&mut data);
    }
    Ok(data)
}

fn crypt(args: ActionCrypt, decrypt: bool) -> Result<(), foxsave::Error> {
    let category = category(args.category, &args.input)?;
    let data = read(&args.input, Some(category))?;

    if decrypt && data.len() >= foxsave::CHECKSUM_SIZE {
        let (stored, payload) = data.split_at(foxsave::CHECKSUM_SIZE);
        if stored != foxsave::checksum(payload) {
            log::warn!("checksum mismatch, wrong category or file is not encrypted?");
        }
    }

    let suffix = if decrypt { "_decoded" } else { "_encoded" };
    let output = args.output.unwrap_or_else(|| {
        let mut name = args.input.clone().into_os_string();
        name.push(suffix);
        name.into()
    });
    fs::write(&output, data)?;
    log::info!("wrote {}", output.display());
    Ok(())
}

fn dump(args: ActionDump) -> Result<(), foxsave::Error> {
    let category = if args.decrypted {
        category(args.category, &args.input).ok()
    } else {
        Some(category(args.category, &args.input)?)
    };
    let dictionary = dictionary(args.dict.as_deref())?;
    let data = read(&args.input, category.filter(|_| !args.decrypted))?;

    let mut builder = SaveBuilder::new().verify_checksum(!args.no_verify);
    if let Some(category) = category {
        builder = builder.category(category);
    }
    if let Some(layout) = args.layout {
        builder = builder.layout(layout);
    }
    let save = builder.parse(&data, &dictionary)?;

    if args.keys_only {
        for variable in save.variables() {
            println!("{}", variable.name);
        }
        return Ok(());
    }
    print_save(&save);
    Ok(())
}

fn print_save(save: &Save) {
    let overlay = Overlay::default();
    println!(
        "{} {}, checksum {}",
        String::from_utf8_lossy(&save.magic()),
        save.layout,
        hex::encode(save.checksum)
    );
    for (i, block) in save.blocks().into_iter().enumerate() {
        println!(
            "block {i}: type {}, version {:#x}, revision {}",
            block.kind, block.version, block.revision
        );
        for section in &block.sections {
            let label = SlotKind::from_section(section.id)
                .map_or_else(|| "unknown".to_owned(), |kind| kind.to_string());
            println!(
                "  section {} ({label}): {} entries",
                section.id,
                section.entry_count()
            );
            for entry in &section.entries {
                let Some(name) = entry.name.as_deref() else {
                    continue;
                };
                match &entry.value {
                    Some(value) => println!(
                        "    {name}: {}[{}] = {}",
                        value.ty(),
                        value.len(),
                        overlay.format(name, value)
                    ),
                    None => println!("    {name}: type tag {}", entry.param.type_tag),
                }
            }
        }
    }
    let diagnostics = save.diagnostics().len();
    if diagnostics > 0 {
        println!("{diagnostics} diagnostics, run with -v for details");
    }
}

fn scan(args: ActionScan) -> Result<(), foxsave::Error> {
    let category = match args.decrypted {
        true => None,
        false => Some(category(args.category, &args.input)?),
    };
    let dictionary = dictionary(Some(&args.dict))?;
    let data = read(&args.input, category)?;
    for hit in dictionary.scan(&data) {
        match hit.value {
            Some(value) => println!("{:08x} {} {value:#010x}", hit.offset, hit.name),
            None => println!("{:08x} {}", hit.offset, hit.name),
        }
    }
    Ok(())
}

fn rewrite(args: ActionRewrite) -> Result<(), foxsave::Error> {
    let category = category(args.category, &args.input)?;
    let mut data = fs::read(&args.input)?;

    let mut builder = SaveBuilder::new().category(category);
    if let Some(layout) = args.layout {
        builder = builder.layout(layout);
    }
    let save = builder.decrypt_and_parse(
        &Cipher::for_category(category),
        &mut data,
        &Dictionary::new(),
    )?;
    fs::write(&args.output, save.to_encrypted(category)?)?;
    log::info!("wrote {}", args.output.display());
    Ok(())
}
