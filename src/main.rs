use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use htmltrim::config::HtmltrimConfig;
use htmltrim::error::{TrimError, clamp_limit};
use htmltrim::lua::PluginEngine;
use htmltrim::{TextHelper, template, text};

#[derive(Parser)]
#[command(name = "htmltrim", about = "HTML 摘要截断工具", version = long_version())]
struct Cli {
    /// 项目根目录，读取其中的 htmltrim.toml 与 plugins/（默认当前目录）
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 按词数截断（字符计数语言下按字符），保留白名单标签
    Words {
        /// 输入文件（默认读取 stdin）
        input: Option<PathBuf>,

        /// 保留的词数
        #[arg(short = 'n', long, allow_negative_numbers = true)]
        num_words: Option<i64>,

        /// 续写标记
        #[arg(long, conflicts_with = "no_more")]
        more: Option<String>,

        /// 截断时不追加续写标记
        #[arg(long)]
        no_more: bool,

        /// 保留的标签，空格分隔
        #[arg(long)]
        allowed_tags: Option<String>,
    },

    /// 去掉全部标签后按显示宽度截断
    Chars {
        /// 输入文件（默认读取 stdin）
        input: Option<PathBuf>,

        /// 最大显示宽度
        #[arg(short = 'n', long, allow_negative_numbers = true)]
        num_chars: Option<i64>,

        /// 续写标记
        #[arg(long, conflicts_with = "no_more")]
        more: Option<String>,

        /// 截断时不追加续写标记
        #[arg(long)]
        no_more: bool,
    },

    /// 补齐未闭合的标签
    CloseTags {
        /// 输入文件（默认读取 stdin）
        input: Option<PathBuf>,
    },

    /// 删除指定元素及其内容
    RemoveTags {
        /// 输入文件（默认读取 stdin）
        input: Option<PathBuf>,

        /// 要删除的标签名，可重复
        #[arg(short, long = "tag", required = true)]
        tags: Vec<String>,
    },

    /// 以 content 变量渲染 MiniJinja 模板
    Render {
        /// 模板文件
        template: PathBuf,

        /// 输入文件（默认读取 stdin）
        input: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let root = cli
        .root
        .canonicalize()
        .with_context(|| format!("项目根目录 {} 不存在", cli.root.display()))?;
    let config = HtmltrimConfig::load(&root)?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log.level)),
        )
        .init();

    let output = match cli.command {
        Commands::Words {
            input,
            num_words,
            more,
            no_more,
            allowed_tags,
        } => {
            let engine = plugin_engine(&root, &config)?;

            let num_words = num_words
                .map_or(config.trim.num_words, |n| clamp_limit("num_words", n));
            let more = resolve_more(more, no_more, &config);
            let allowed_tags = allowed_tags.unwrap_or_else(|| config.trim.allowed_tags.clone());

            let helper = TextHelper::with_hooks(config.locale.clone(), engine);
            let bytes = read_input(input.as_deref())?;
            helper.trim_words_bytes(&bytes, num_words, more.as_deref(), &allowed_tags)?
        }
        Commands::Chars {
            input,
            num_chars,
            more,
            no_more,
        } => {
            let num_chars = num_chars
                .map_or(config.trim.num_chars, |n| clamp_limit("num_chars", n));
            let more = resolve_more(more, no_more, &config);

            let helper = TextHelper::new(config.locale.clone());
            let content = read_text(input.as_deref())?;
            helper.trim_characters(&content, num_chars, more.as_deref())
        }
        Commands::CloseTags { input } => text::close_tags(&read_text(input.as_deref())?),
        Commands::RemoveTags { input, tags } => {
            text::remove_tags(&read_text(input.as_deref())?, &tags)
        }
        Commands::Render {
            template: template_path,
            input,
        } => {
            let source = std::fs::read_to_string(&template_path)
                .with_context(|| format!("读取模板 {} 失败", template_path.display()))?;
            let content = read_text(input.as_deref())?;
            let engine = plugin_engine(&root, &config)?;
            let hooks = Mutex::new(engine);
            let helper = Arc::new(TextHelper::with_hooks(config.locale.clone(), hooks));
            template::render(&source, &content, helper, &config.trim)
                .map_err(|e| anyhow::anyhow!("渲染模板 {} 失败：{e}", template_path.display()))?
        }
    };

    println!("{output}");
    Ok(())
}

fn plugin_engine(root: &Path, config: &HtmltrimConfig) -> anyhow::Result<PluginEngine> {
    let mut engine = PluginEngine::new(root, &config.locale)?;
    engine.load_plugins(&config.plugins.enabled)?;
    Ok(engine)
}

/// `--no-more` 优先，其次命令行 `--more`，最后是配置中的 more；都没有时使用本地化默认值
fn resolve_more(more: Option<String>, no_more: bool, config: &HtmltrimConfig) -> Option<String> {
    if no_more {
        return Some(String::new());
    }
    more.or_else(|| config.trim.more.clone())
}

fn read_input(path: Option<&Path>) -> anyhow::Result<Vec<u8>> {
    match path {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("读取 {} 失败", path.display()))
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("读取 stdin 失败")?;
            Ok(buf)
        }
    }
}

fn read_text(path: Option<&Path>) -> anyhow::Result<String> {
    let bytes = read_input(path)?;
    String::from_utf8(bytes)
        .map_err(|e| TrimError::invalid("text", format!("不是合法的 UTF-8：{e}")).into())
}

const fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        "\ncommit:  ",
        env!("HTMLTRIM_GIT_COMMIT"),
        "\nbuild:   ",
        env!("HTMLTRIM_BUILD_DATE"),
        "\ntarget:  ",
        env!("HTMLTRIM_BUILD_TARGET"),
    )
}
