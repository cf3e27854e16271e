//! Interactive menu over a line-oriented input and a text output.

use std::io::{self, Write};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::info;

use crate::cache::{CacheManager, RefreshReport};
use crate::format::Formatter;
use crate::search::{SearchEngine, SearchOptions};
use crate::sources::{DefinitionSource, WordSource};

const RULE: &str = "===============================================================";

const WELCOME: &str = "\
===============================================================
========== BIENVENIDO AL DICCIONARIO INVERSO ==================
===============================================================";

const MENU: [&str; 7] = [
    "Realizar una búsqueda inversa.",
    "Realizar una búsqueda normal en el diccionario.",
    "Ver cuántas palabras hay almacenadas (número).",
    "Ver cuántas definiciones hay almacenadas (número).",
    "Descargar todas las palabras del castellano.",
    "Descargar todas las definiciones de las palabras almacenadas.",
    "Salir y cerrar el programa.",
];

const REVERSE_COMMANDS: [(&str, &str); 3] = [
    (
        "/salir",
        "Salir del modo 'Búsqueda Inversa' y volver al menú principal.",
    ),
    (
        "/def",
        "Los resultados de la búsqueda inversa se devolverán con definiciones. Por defecto esto no ocurre.",
    ),
    (
        "/nodef",
        "Los resultados de la búsqueda inversa se devolverán sin definiciones, sólo las palabras.",
    ),
];

const DIRECT_COMMANDS: [(&str, &str); 1] = [(
    "/salir",
    "Salir del modo 'Búsqueda Directa' y volver al menú principal.",
)];

const EXIT: &str = "/salir";

pub struct Console<'a, S, D, R, O> {
    cache: &'a mut CacheManager<S, D>,
    engine: SearchEngine,
    lines: Lines<R>,
    out: O,
}

impl<'a, S, D, R, O> Console<'a, S, D, R, O>
where
    S: WordSource,
    D: DefinitionSource,
    R: AsyncBufRead + Unpin,
    O: Write,
{
    pub fn new(cache: &'a mut CacheManager<S, D>, formatter: Formatter, input: R, out: O) -> Self {
        let engine = SearchEngine::new(cache.corpus(), formatter);
        Self {
            cache,
            engine,
            lines: input.lines(),
            out,
        }
    }

    /// Run the main menu until the exit option or end of input.
    pub async fn run(mut self) -> io::Result<()> {
        writeln!(self.out, "{WELCOME}")?;
        loop {
            writeln!(
                self.out,
                "\n\n======================= MENÚ PRINCIPAL ======================="
            )?;
            for (i, item) in MENU.iter().enumerate() {
                writeln!(self.out, "{}\t{item}", i + 1)?;
            }
            writeln!(self.out, "{RULE}")?;

            let Some(selection) = self.prompt("MENU").await? else {
                return Ok(());
            };
            match selection.trim().parse::<usize>() {
                Ok(1) => self.reverse_mode().await?,
                Ok(2) => self.direct_mode().await?,
                Ok(3) => writeln!(
                    self.out,
                    "Hay {} palabras almacenadas en el sistema.",
                    self.cache.word_count()
                )?,
                Ok(4) => writeln!(
                    self.out,
                    "Hay {} definiciones totales almacenadas en el sistema.",
                    self.cache.definition_count()
                )?,
                Ok(5) => {
                    let report = self.cache.refresh(true, false).await;
                    self.report(&report)?;
                }
                Ok(6) => {
                    let report = self.cache.refresh(false, true).await;
                    self.engine.set_corpus(self.cache.corpus());
                    self.report(&report)?;
                }
                Ok(7) => return Ok(()),
                _ => writeln!(
                    self.out,
                    "Introduce un numero que se corresponda a una opción del menú."
                )?,
            }
        }
    }

    async fn reverse_mode(&mut self) -> io::Result<()> {
        self.mode_help("BUSQUEDA INVERSA", "la búsqueda inversa", &REVERSE_COMMANDS)?;
        while let Some(query) = self.prompt("BÚSQUEDA INVERSA").await? {
            let query = query.trim();
            match query {
                "" => {}
                EXIT => break,
                "/def" => self.engine.set_default_include_definitions(true),
                "/nodef" => self.engine.set_default_include_definitions(false),
                _ if query.starts_with('/') => writeln!(self.out, "No reconozco ese comando.")?,
                _ => {
                    writeln!(self.out, "Resultados:")?;
                    for result in self.engine.reverse_search(query, SearchOptions::default()) {
                        writeln!(self.out, "{result}")?;
                    }
                }
            }
        }
        Ok(())
    }

    async fn direct_mode(&mut self) -> io::Result<()> {
        self.mode_help(
            "BUSQUEDA DIRECTA",
            "la búsqueda de dicha palabra",
            &DIRECT_COMMANDS,
        )?;
        while let Some(query) = self.prompt("BÚSQUEDA DIRECTA").await? {
            let query = query.trim();
            if query == EXIT {
                break;
            }
            if let Some(lookup) = self.engine.direct_lookup(query, None) {
                writeln!(self.out, "Resultados:\n{}", lookup.into_text())?;
            }
        }
        Ok(())
    }

    fn mode_help(&mut self, title: &str, action: &str, commands: &[(&str, &str)]) -> io::Result<()> {
        writeln!(self.out, "{RULE}")?;
        writeln!(self.out, "{:=^63}", format!(" MODO {title} "))?;
        writeln!(self.out, "{RULE}")?;
        writeln!(
            self.out,
            "Introduce una busqueda en la linea de comandos para realizar {action}."
        )?;
        writeln!(
            self.out,
            "Para introducir un comando haz:\t'/comando'.\nLos comandos disponibles son:\n"
        )?;
        for (i, (command, description)) in commands.iter().enumerate() {
            writeln!(self.out, "{}\t{command}\t=>\t{description}", i + 1)?;
        }
        writeln!(self.out, "{RULE}")
    }

    async fn prompt(&mut self, mode: &str) -> io::Result<Option<String>> {
        write!(self.out, "[MODO {mode}]>> ")?;
        self.out.flush()?;
        self.lines.next_line().await
    }

    fn report(&mut self, report: &RefreshReport) -> io::Result<()> {
        info!(
            fetched = report.letters_fetched.len(),
            resumed = report.letters_resumed.len(),
            failed = report.failed_items,
            "download finished"
        );
        if report.is_clean() {
            writeln!(self.out, "Descarga completada.")
        } else {
            writeln!(
                self.out,
                "Descarga completada con {} fallos y {} errores al guardar.",
                report.failed_items,
                report.persist_errors.len()
            )
        }
    }
}
