mod cache;
mod commands;
mod config;
mod console;
mod corpus;
mod format;
mod normalize;
mod search;
mod session;
mod sources;
mod store;

pub const USER_AGENT: &str = concat!("inverso/", env!("CARGO_PKG_VERSION"));

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use reqwest::Client;
use tracing::{info, warn};

use cache::CacheManager;
use commands::{ChatAdapter, Delivery, Reply};
use config::Config;
use console::Console;
use corpus::{Corpus, LETTERS};
use format::{Formatter, OutputVariant};
use search::{SearchEngine, SearchOptions};
use session::{MessageRef, SessionStore};
use sources::{DictionaryClient, WordsClient};

/// TCP connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Global HTTP client timeout covering DNS + connect + response body.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// Maximum redirect hops before aborting.
const MAX_REDIRECTS: usize = 5;

/// Spanish reverse dictionary: find words by what their definitions say.
#[derive(Parser, Debug)]
#[command(name = "inverso", version, about)]
struct Cli {
    /// Directory holding the cached words and definitions
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output format: console or chat
    #[arg(long, global = true, default_value = "console")]
    format: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download again the word list, the definitions or both
    Refresh {
        #[arg(short, long)]
        words: bool,
        #[arg(short, long)]
        definitions: bool,
    },
    /// Words whose definitions contain every term
    Search {
        #[arg(required = true)]
        terms: Vec<String>,
        /// Print the definitions of every result
        #[arg(long)]
        definitions: bool,
        /// Split terms on this string instead of spaces
        #[arg(long, value_parser = clap::builder::NonEmptyStringValueParser::new())]
        separator: Option<String>,
    },
    /// Definitions of one word
    Lookup { word: String },
    /// Word and definition counts
    Stats,
    /// Interactive menu (default)
    Console,
    /// Handle one chat message and print the reply
    Chat {
        #[arg(allow_negative_numbers = true)]
        chat_id: i64,
        /// Navigation button payload instead of a message
        #[arg(long, conflicts_with = "text")]
        callback: Option<String>,
        /// Id of the message that delivered the last search results
        #[arg(long, conflicts_with_all = ["text", "callback"])]
        sent: Option<i64>,
        text: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("inverso=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let variant: OutputVariant = cli.format.parse()?;
    let mut config = Config::from_env()?;
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }
    info!(data_dir = %config.data_dir.display(), "starting inverso");

    let http = Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(HTTP_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()?;
    let mut cache = CacheManager::new(
        WordsClient::new(http.clone(), &config),
        DictionaryClient::new(http, &config),
        config.paths(),
    );
    let formatter = Formatter::new(variant);

    match cli.command.unwrap_or(Command::Console) {
        Command::Refresh { words, definitions } => {
            let (words_ok, definitions_ok) = cache.load();
            let report = cache
                .refresh(words || !words_ok, definitions || !definitions_ok)
                .await;
            for e in &report.persist_errors {
                warn!(error = %e, "cache not fully saved");
            }
            println!(
                "{} letters downloaded, {} resumed, {} failed items",
                report.letters_fetched.len(),
                report.letters_resumed.len(),
                report.failed_items
            );
            println!("definitions in {}", cache.paths().definitions_file.display());
        }
        Command::Search {
            terms,
            definitions,
            separator,
        } => {
            cache.initialize().await;
            let engine = index(cache.corpus(), formatter);
            let separator = separator.as_deref();
            let query = terms.join(separator.unwrap_or(search::DEFAULT_SEPARATOR));
            let options = SearchOptions {
                separator,
                include_definitions: Some(definitions),
                raw: false,
            };
            for result in engine.reverse_search(&query, options) {
                println!("{result}");
            }
        }
        Command::Lookup { word } => {
            cache.initialize().await;
            let engine = index(cache.corpus(), formatter);
            match engine.direct_lookup(&word, None) {
                Some(lookup) => println!("{}", lookup.into_text()),
                None => info!(%word, "lookup takes a single word; query ignored"),
            }
        }
        Command::Stats => {
            cache.initialize().await;
            println!("Hay {} palabras almacenadas en el sistema.", cache.word_count());
            println!(
                "Hay {} definiciones totales almacenadas en el sistema.",
                cache.definition_count()
            );
            if let Some(letter) = cache.letter_with_most_words() {
                println!("La letra por la que empiezan más palabras es la {letter}.");
            }
            println!("letra\tlistadas\tpalabras\tdefiniciones");
            for letter in LETTERS {
                println!(
                    "{letter}\t{}\t{}\t{}",
                    cache.words().get(letter).map_or(0, |w| w.len()),
                    cache.word_count_for(letter),
                    cache.definition_count_for(letter)
                );
            }
        }
        Command::Console => {
            cache.initialize().await;
            let input = tokio::io::BufReader::new(tokio::io::stdin());
            Console::new(&mut cache, formatter, input, std::io::stdout())
                .run()
                .await?;
        }
        Command::Chat {
            chat_id,
            callback,
            sent,
            text,
        } => {
            cache.initialize().await;
            let sessions = SessionStore::load(&config.sessions_file());
            let mut chat = ChatAdapter::new(cache.corpus(), sessions);
            let reply = match (sent, callback) {
                (Some(message_id), _) => {
                    chat.record_sent(MessageRef {
                        chat_id,
                        message_id,
                    });
                    None
                }
                (None, Some(data)) => chat.handle_callback(chat_id, &data),
                (None, None) => chat.handle(chat_id, &text.join(" ")),
            };
            match reply {
                Some(reply) => println!("{}", render_reply(&reply)),
                None => info!(chat_id, "no reply"),
            }
            if !chat.sessions().is_empty() {
                match chat.save_sessions() {
                    Ok(()) => info!(chats = chat.sessions().len(), "sessions saved"),
                    Err(e) => warn!(error = %e, "sessions not saved"),
                }
            }
        }
    }

    Ok(())
}

/// Search index over `corpus`, warning when there is nothing to search.
fn index(corpus: &Corpus, formatter: Formatter) -> SearchEngine {
    let engine = SearchEngine::new(corpus, formatter);
    if engine.is_empty() {
        warn!("no definitions cached yet; run `inverso refresh`");
    }
    info!(words = engine.len(), "index built");
    engine
}

/// Plain-text view of a chat reply: how to deliver it, the text, then buttons.
fn render_reply(reply: &Reply) -> String {
    let mut out = match reply.delivery {
        Delivery::Send => String::new(),
        Delivery::Replace(m) => format!("(replaces message {})\n", m.message_id),
        Delivery::Edit(m) => format!("(edits message {})\n", m.message_id),
    };
    out.push_str(&reply.text);
    if let Some(nav) = &reply.navigation {
        out.push_str(&format!(
            "\n[< {}] {}    [{} >] {}",
            nav.previous.label, nav.previous.data, nav.next.label, nav.next.data
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Button, Navigation};

    #[test]
    fn empty_separator_is_rejected() {
        let parsed = Cli::try_parse_from(["inverso", "search", "a", "b", "--separator", ""]);
        assert!(parsed.is_err());

        let parsed = Cli::try_parse_from(["inverso", "search", "a,b", "--separator", ","]);
        assert!(parsed.is_ok());
    }

    #[test]
    fn chat_accepts_negative_ids_and_sent_message() {
        let cli = Cli::try_parse_from(["inverso", "chat", "-1001", "--sent", "42"]).unwrap();
        match cli.command {
            Some(Command::Chat {
                chat_id: -1001,
                sent: Some(42),
                ..
            }) => {}
            other => panic!("unexpected: {other:?}"),
        }
        assert!(Cli::try_parse_from(["inverso", "chat", "1", "--sent", "4", "hola"]).is_err());
    }

    #[test]
    fn rendered_reply_shows_delivery_and_buttons() {
        let reply = Reply {
            text: "<b>albo</b>".into(),
            navigation: Some(Navigation {
                previous: Button {
                    label: "ebúrneo".into(),
                    data: "n:1".into(),
                },
                next: Button {
                    label: "ebúrneo".into(),
                    data: "n:1".into(),
                },
            }),
            delivery: Delivery::Replace(MessageRef {
                chat_id: 7,
                message_id: 10,
            }),
        };
        assert_eq!(
            render_reply(&reply),
            "(replaces message 10)\n<b>albo</b>\n[< ebúrneo] n:1    [ebúrneo >] n:1"
        );
    }
}
