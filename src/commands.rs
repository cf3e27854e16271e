//! Chat command handling, independent of any chat transport.
//!
//! [`ChatAdapter`] turns message text into a [`Reply`] and tracks the last
//! reverse search of each chat so its results can be paged with buttons.

use tracing::{debug, info};

use crate::corpus::Corpus;
use crate::format::{Formatter, NOT_FOUND, OutputVariant};
use crate::search::{SearchEngine, SearchOptions};
use crate::session::{MessageRef, SessionStore};
use crate::store::StoreError;

const WELCOME: &str = "Bienvenido al bot!\n\
    Si no sabes muy bien qué hacer haz <i>/ayuda</i> para ver qué puedo hacer.";

const HELP: &str = "<b> Menú de ayuda </b>\n\
    Los comandos disponibles son los siguientes:\n\
    <b><i>/ayuda</i></b>\t:\tMuestra este menú.\n\n\
    <b><i>/encuentra</i></b>\t:\tRealiza una búsqueda inversa en todo el diccionario.\n\
    \t<i>Ejemplo:\t/encuentra parecido marfil</i>\n\
    \tY entre las respuestas te aparecerá <b>ebúrneo</b>.\n\n\
    <b><i>/busca</i></b>\t:\tBusca una palabra en el diccionario de forma normal, \
    devolviéndote sus definiciones.\n\
    \t<i>Ejemplo:\t/busca ebúrneo</i>\n\n\
    <b><i>/estadisticas</i></b>\t:\tTe responde con diversas estadísticas del sistema.\n";

const NO_RESULTS: &str = "No he encontrado ningún resultado.";
const UNKNOWN_COMMAND: &str = "No entiendo ese comando.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    /// `/busca <word>`
    Lookup(String),
    /// `/encuentra <terms>`
    Find(String),
    Stats,
    Unknown(String),
}

impl Command {
    /// First whitespace-separated token is the command, the rest joined by
    /// single spaces is its query. A `@botname` suffix on the command is ignored.
    pub fn parse(text: &str) -> Self {
        let mut tokens = text.split_whitespace();
        let Some(head) = tokens.next() else {
            return Command::Unknown(String::new());
        };
        let query = tokens.collect::<Vec<_>>().join(" ");
        let name = head.split_once('@').map_or(head, |(name, _)| name);

        match name {
            "/start" => Command::Start,
            "/ayuda" => Command::Help,
            "/busca" => Command::Lookup(query),
            "/encuentra" => Command::Find(query),
            "/estadisticas" => Command::Stats,
            _ => Command::Unknown(head.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    /// Opaque payload sent back through [`ChatAdapter::handle_callback`].
    pub data: String,
}

/// Previous/next buttons over the stored results, wrapping at both ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub previous: Button,
    pub next: Button,
}

/// How the transport should deliver a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Send,
    /// Delete the referenced message, then send.
    Replace(MessageRef),
    Edit(MessageRef),
}

/// Reply text is chat HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub navigation: Option<Navigation>,
    pub delivery: Delivery,
}

impl Reply {
    fn send(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            navigation: None,
            delivery: Delivery::Send,
        }
    }
}

pub struct ChatAdapter<'a> {
    corpus: &'a Corpus,
    engine: SearchEngine,
    sessions: SessionStore,
}

impl<'a> ChatAdapter<'a> {
    pub fn new(corpus: &'a Corpus, sessions: SessionStore) -> Self {
        Self {
            corpus,
            engine: SearchEngine::new(corpus, Formatter::new(OutputVariant::Chat)),
            sessions,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn save_sessions(&self) -> Result<(), StoreError> {
        self.sessions.save()
    }

    /// Reply to one message. `/busca` with more than one word gets no reply.
    pub fn handle(&mut self, chat_id: i64, text: &str) -> Option<Reply> {
        let command = Command::parse(text);
        info!(chat_id, ?command, "chat command");

        let reply = match command {
            Command::Start => Reply::send(WELCOME),
            Command::Help => Reply::send(HELP),
            Command::Lookup(word) => {
                Reply::send(self.engine.direct_lookup(&word, None)?.into_text())
            }
            Command::Find(query) => self.find(chat_id, &query),
            Command::Stats => Reply::send(self.stats()),
            Command::Unknown(_) => Reply::send(UNKNOWN_COMMAND),
        };
        Some(reply)
    }

    /// Page through the last reverse search. `None` when the button belongs to
    /// an older search, the payload is malformed or the index is out of range.
    pub fn handle_callback(&mut self, chat_id: i64, data: &str) -> Option<Reply> {
        let (nonce, index) = data.split_once(':')?;
        let session = self.sessions.get(chat_id)?;
        if session.nonce.as_deref() != Some(nonce) {
            debug!(chat_id, "ignoring stale navigation");
            return None;
        }
        let index: usize = index.parse().ok()?;
        if index >= session.last_results.len() {
            return None;
        }

        let (text, navigation) = page(&self.engine, nonce, &session.last_results, index);
        Some(Reply {
            text,
            navigation,
            delivery: session
                .last_message
                .map_or(Delivery::Send, Delivery::Edit),
        })
    }

    /// Remember the message the transport sent for the last reverse search.
    pub fn record_sent(&mut self, message: MessageRef) {
        self.sessions.entry(message.chat_id).last_message = Some(message);
    }

    fn find(&mut self, chat_id: i64, query: &str) -> Reply {
        let options = SearchOptions {
            include_definitions: Some(false),
            raw: true,
            ..SearchOptions::default()
        };
        let words: Vec<String> = self
            .engine
            .reverse_search(query, options)
            .iter()
            .filter_map(|r| r.word().map(str::to_string))
            .collect();
        debug!(chat_id, results = words.len(), "reverse search");

        let session = self.sessions.entry(chat_id);
        let delivery = session
            .last_message
            .take()
            .map_or(Delivery::Send, Delivery::Replace);
        let nonce = format!("{:016x}", fastrand::u64(..));
        session.nonce = Some(nonce.clone());
        session.last_results = words;

        if session.last_results.is_empty() {
            return Reply {
                text: NO_RESULTS.to_string(),
                navigation: None,
                delivery,
            };
        }
        let (text, navigation) = page(&self.engine, &nonce, &session.last_results, 0);
        Reply {
            text,
            navigation,
            delivery,
        }
    }

    fn stats(&self) -> String {
        format!(
            "En el sistema hay un total de <b>{}</b> <i>palabras</i>.\n\
             En el sistema hay un total de <b>{}</b> <i>definiciones</i>.\n\
             La letra por la que <b>empiezan más palabras</b> es la <i>{}</i>.\n",
            self.corpus.word_count(),
            self.corpus.definition_count(),
            self.corpus.letter_with_most_words().unwrap_or("-"),
        )
    }
}

/// Definitions of `results[index]` and, with more than one result, buttons to
/// its neighbours.
fn page(
    engine: &SearchEngine,
    nonce: &str,
    results: &[String],
    index: usize,
) -> (String, Option<Navigation>) {
    let word = &results[index];
    let text = engine
        .entry(word)
        .map(|entry| engine.formatter().format_word(entry, true, false).to_string())
        .unwrap_or_else(|| NOT_FOUND.to_string());

    let len = results.len();
    let navigation = (len > 1).then(|| {
        let button = |i: usize| Button {
            label: results[i].clone(),
            data: format!("{nonce}:{i}"),
        };
        Navigation {
            previous: button((index + len - 1) % len),
            next: button((index + 1) % len),
        }
    });
    (text, navigation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::sample_corpus;

    fn adapter(corpus: &Corpus) -> (ChatAdapter<'_>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionStore::load(&dir.path().join("sessions.json"));
        (ChatAdapter::new(corpus, sessions), dir)
    }

    #[test]
    fn parses_commands_and_queries() {
        assert_eq!(Command::parse("/start"), Command::Start);
        assert_eq!(Command::parse("  /ayuda  "), Command::Help);
        assert_eq!(
            Command::parse("/encuentra  parecido   marfil"),
            Command::Find("parecido marfil".into())
        );
        assert_eq!(
            Command::parse("/busca@InversoBot ebúrneo"),
            Command::Lookup("ebúrneo".into())
        );
        assert_eq!(Command::parse("/estadisticas"), Command::Stats);
        assert_eq!(Command::parse("hola"), Command::Unknown("hola".into()));
        assert_eq!(Command::parse(""), Command::Unknown(String::new()));
    }

    #[test]
    fn lookup_replies_with_chat_markup() {
        let corpus = sample_corpus();
        let (mut chat, _dir) = adapter(&corpus);

        let reply = chat.handle(1, "/busca albo").unwrap();
        assert_eq!(reply.text, "<b>albo</b>\n<i>1.</i> Blanco.\n");
        assert_eq!(reply.delivery, Delivery::Send);

        assert_eq!(chat.handle(1, "/busca marfil").unwrap().text, NOT_FOUND);
        assert_eq!(chat.handle(1, "/busca albo ebúrneo"), None);
    }

    #[test]
    fn stats_report_totals_and_top_letter() {
        let corpus = sample_corpus();
        let (mut chat, _dir) = adapter(&corpus);

        let text = chat.handle(1, "/estadisticas").unwrap().text;
        assert!(text.contains("<b>5</b> <i>palabras</i>"));
        assert!(text.contains("<b>6</b> <i>definiciones</i>"));
        assert!(text.contains("es la <i>A</i>"));
    }

    #[test]
    fn unknown_command_gets_a_hint() {
        let corpus = sample_corpus();
        let (mut chat, _dir) = adapter(&corpus);
        assert_eq!(chat.handle(1, "/contacto hola").unwrap().text, UNKNOWN_COMMAND);
    }

    #[test]
    fn find_stores_results_and_wraps_navigation() {
        let corpus = sample_corpus();
        let (mut chat, _dir) = adapter(&corpus);

        let reply = chat.handle(7, "/encuentra blanco").unwrap();
        assert!(reply.text.starts_with("<b>albo</b>"));

        let session = chat.sessions().get(7).unwrap();
        assert_eq!(session.last_results, vec!["albo".to_string(), "ebúrneo".to_string()]);
        let nonce = session.nonce.clone().unwrap();

        let nav = reply.navigation.unwrap();
        assert_eq!(nav.previous.label, "ebúrneo");
        assert_eq!(nav.previous.data, format!("{nonce}:1"));
        assert_eq!(nav.next.data, format!("{nonce}:1"));

        chat.record_sent(MessageRef {
            chat_id: 7,
            message_id: 99,
        });
        let page = chat.handle_callback(7, &nav.next.data).unwrap();
        assert!(page.text.starts_with("<b>ebúrneo</b>"));
        assert_eq!(
            page.delivery,
            Delivery::Edit(MessageRef {
                chat_id: 7,
                message_id: 99
            })
        );
        assert_eq!(page.navigation.unwrap().next.data, format!("{nonce}:0"));
    }

    #[test]
    fn single_result_has_no_navigation() {
        let corpus = sample_corpus();
        let (mut chat, _dir) = adapter(&corpus);
        let reply = chat.handle(7, "/encuentra leñoso").unwrap();
        assert!(reply.text.starts_with("<b>árbol</b>"));
        assert!(reply.navigation.is_none());
    }

    #[test]
    fn new_search_replaces_previous_message_and_invalidates_buttons() {
        let corpus = sample_corpus();
        let (mut chat, _dir) = adapter(&corpus);

        let first = chat.handle(7, "/encuentra blanco").unwrap();
        let old = first.navigation.unwrap().next.data;
        let sent = MessageRef {
            chat_id: 7,
            message_id: 10,
        };
        chat.record_sent(sent);

        let second = chat.handle(7, "/encuentra xilófono").unwrap();
        assert_eq!(second.text, NO_RESULTS);
        assert_eq!(second.delivery, Delivery::Replace(sent));
        assert!(chat.handle_callback(7, &old).is_none());
    }

    #[test]
    fn malformed_callbacks_are_ignored() {
        let corpus = sample_corpus();
        let (mut chat, _dir) = adapter(&corpus);
        chat.handle(7, "/encuentra blanco").unwrap();
        let nonce = chat.sessions().get(7).unwrap().nonce.clone().unwrap();

        assert!(chat.handle_callback(7, "sin-separador").is_none());
        assert!(chat.handle_callback(7, &format!("{nonce}:x")).is_none());
        assert!(chat.handle_callback(7, &format!("{nonce}:5")).is_none());
        assert!(chat.handle_callback(8, &format!("{nonce}:0")).is_none());
    }

    #[test]
    fn sessions_survive_a_restart() {
        let corpus = sample_corpus();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");

        let mut chat = ChatAdapter::new(&corpus, SessionStore::load(&path));
        let next = chat.handle(3, "/encuentra blanco").unwrap().navigation.unwrap().next;
        chat.save_sessions().unwrap();

        let mut restarted = ChatAdapter::new(&corpus, SessionStore::load(&path));
        let page = restarted.handle_callback(3, &next.data).unwrap();
        assert!(page.text.starts_with("<b>ebúrneo</b>"));
    }
}
