use anyhow::{Context, Result};
use blogpix_core::{
    app_paths, apply_plan, build_plan, collect_sources, load_config, load_config_from, parse_list,
    render_tags, save_config_to, upload_list, AppConfig, ApplyError, KeySource, ListEntry,
    PlanOptions, RenamePlan, S3Store, SourceOptions, StoreSettings, TagOptions,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "blogpix")]
#[command(about = "ブログ用写真のリネームと埋め込みタグ生成")]
struct Cli {
    /// 設定ファイル (省略時はOS標準の設定ディレクトリ)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// JPGを撮影日時のファイル名にリネームします
    Rename(RenameArgs),
    /// 画像リストからHTML埋め込みタグを生成します
    Tags(TagsArgs),
    /// 画像リストの写真をバケットへアップロードし、埋め込みタグを出力します
    Upload(TagsArgs),
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Show,
    Init,
}

#[derive(Debug, Args)]
struct RenameArgs {
    /// フォルダ1つ、ファイル1つ、またはファイルの一覧
    #[arg(required = true)]
    paths: Vec<PathBuf>,
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    #[arg(long, value_enum)]
    key: Option<KeyArg>,
    #[arg(long)]
    extension: Option<String>,
    #[arg(long, default_value_t = false)]
    include_hidden: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[derive(Debug, Args)]
struct TagsArgs {
    list: PathBuf,
    #[arg(long)]
    local_dir: Option<PathBuf>,
    #[arg(long)]
    bucket: Option<String>,
    #[arg(long)]
    base_url: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KeyArg {
    Exif,
    Modified,
    ExifOrModified,
}

impl From<KeyArg> for KeySource {
    fn from(value: KeyArg) -> Self {
        match value {
            KeyArg::Exif => KeySource::Exif,
            KeyArg::Modified => KeySource::Modified,
            KeyArg::ExifOrModified => KeySource::ExifOrModified,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Commands::Rename(args) => cmd_rename(args, &config),
        Commands::Tags(args) => cmd_tags(args, &config),
        Commands::Upload(args) => cmd_upload(args, &config),
        Commands::Config(config_args) => match config_args.action {
            ConfigAction::Show => cmd_config_show(cli.config, &config),
            ConfigAction::Init => cmd_config_init(cli.config),
        },
    }
}

fn cmd_rename(args: RenameArgs, config: &AppConfig) -> Result<()> {
    let source_options = SourceOptions {
        include_hidden: args.include_hidden,
    };
    let files = collect_sources(&args.paths, &source_options)?;
    info!("対象ファイル: {}件", files.len());

    let key_source = args.key.map(KeySource::from).unwrap_or(config.key_source);
    let options = PlanOptions {
        extension: args.extension.unwrap_or_else(|| config.extension.clone()),
    };
    let plan = build_plan(&files, &key_source, &options)?;

    match args.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        OutputFormat::Table => {
            print_table(&plan);
        }
    }

    if args.dry_run {
        eprintln!("dry-runモード: 実ファイルは変更していません。");
        return Ok(());
    }

    let result = apply_plan(&plan).map_err(|err| {
        if let ApplyError::RenameFailed {
            applied, remaining, ..
        } = &err
        {
            eprintln!(
                "中断しました: 適用済み {}件, 未適用 {}件",
                applied.len(),
                remaining
            );
        }
        err
    })?;
    eprintln!(
        "適用完了: {}件 (変更なし {}件)",
        result.applied.len(),
        result.unchanged
    );
    Ok(())
}

fn read_list(args: TagsArgs, config: &AppConfig) -> Result<(Vec<ListEntry>, TagOptions)> {
    let body = fs::read_to_string(&args.list)
        .with_context(|| format!("画像リストを読めませんでした: {}", args.list.display()))?;
    let options = TagOptions {
        local_dir: args.local_dir.unwrap_or_else(|| config.local_dir.clone()),
        bucket: args.bucket.unwrap_or_else(|| config.bucket.clone()),
        base_url: args.base_url.unwrap_or_else(|| config.base_url.clone()),
    };
    Ok((parse_list(&body), options))
}

fn cmd_tags(args: TagsArgs, config: &AppConfig) -> Result<()> {
    let (entries, options) = read_list(args, config)?;
    for html in render_tags(&entries, &options)? {
        println!("{}", html);
    }
    Ok(())
}

fn cmd_upload(args: TagsArgs, config: &AppConfig) -> Result<()> {
    let (entries, options) = read_list(args, config)?;
    let settings = StoreSettings {
        bucket: options.bucket.clone(),
        base_url: options.base_url.clone(),
        ..StoreSettings::from_config(config)
    };
    let store = S3Store::connect(&settings)?;

    let uploaded = upload_list(&store, &entries, &options.local_dir)?;
    let failed = uploaded.iter().filter(|entry| entry.name.is_empty()).count();
    for html in render_tags(&uploaded, &options)? {
        println!("{}", html);
    }
    eprintln!(
        "アップロード完了: {}件 (サイズ不一致 {}件)",
        uploaded.len() - failed,
        failed
    );
    Ok(())
}

fn cmd_config_show(path: Option<PathBuf>, config: &AppConfig) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => app_paths()?.config_path,
    };
    let mut shown = config.clone();
    if !shown.secret_key.is_empty() {
        shown.secret_key = "********".to_string();
    }
    println!("設定ファイル: {}", path.display());
    println!("{}", toml::to_string_pretty(&shown)?);
    Ok(())
}

fn cmd_config_init(path: Option<PathBuf>) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => app_paths()?.config_path,
    };
    if path.exists() {
        anyhow::bail!("設定ファイルは既に存在します: {}", path.display());
    }
    save_config_to(&AppConfig::default(), &path)?;
    println!("設定ファイルを作成しました: {}", path.display());
    Ok(())
}

fn print_table(plan: &RenamePlan) {
    println!("元ファイル -> 新ファイル");
    for entry in &plan.entries {
        let marker = if entry.changed { "" } else { " (変更なし)" };
        println!(
            "{} -> {}{}",
            entry.original_path.display(),
            entry.target_path.display(),
            marker
        );
    }

    println!(
        "\n集計: planned={} unchanged={} unknown_date={} suffixed={}",
        plan.stats.planned, plan.stats.unchanged, plan.stats.unknown_date, plan.stats.suffixed
    );
}
