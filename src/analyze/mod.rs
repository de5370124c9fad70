//! Two-pass analysis of input files into capture records.
//!
//! Pass 1 runs the classifier's declaration step over every batch of every
//! input in the run, so the symbol table is complete before pass 2 classifies
//! anything. Pass 2 writes one capture file per input, followed by its
//! metrics line, and persists the symbols that input declared.

pub mod batch;
pub mod classifier;
pub mod import;
pub mod token_cursor;

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::capture::{CaptureRecord, CaptureWriter, MetricsLine, ReportLayout};
use crate::config::CompassConfig;
use crate::error::CompassError;
use crate::names::NameResolver;
use crate::symtab::{load_symbol_table, save_symbol_table, SymbolFileHeader, SymbolTable};

pub use batch::{decode_input, read_input, split_batches, Batch, DecodedInput};
pub use classifier::{
    AnalysisScope, BatchOutcome, Classifier, Construct, EmittedConstruct, RuleClassifier,
};
pub use import::{read_import, read_import_header, write_import, ImportHeader};

/// One input file and the application it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub path: PathBuf,
    pub app: String,
}

impl InputFile {
    pub fn new(path: impl Into<PathBuf>, app: &str) -> Self {
        Self {
            path: path.into(),
            app: app.to_string(),
        }
    }
}

/// Totals of one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisSummary {
    pub files: usize,
    pub batches: u32,
    pub error_batches: u32,
    pub lines: u32,
    pub records: usize,
}

/// An input ready for both passes.
struct PendingInput {
    header: ImportHeader,
    text: String,
    /// Symbols declared by this input
    declared: SymbolTable,
}

/// Analysis state for one report: the merged symbol table, the name
/// resolver and the classifier.
pub struct AnalysisSession<C: Classifier = RuleClassifier> {
    layout: ReportLayout,
    config: CompassConfig,
    classifier: C,
    resolver: NameResolver,
    symbols: SymbolTable,
}

impl AnalysisSession<RuleClassifier> {
    /// Open a session with the reference classifier.
    pub fn open(layout: ReportLayout, config: CompassConfig) -> Result<Self> {
        Self::with_classifier(layout, config, RuleClassifier::new())
    }
}

impl<C: Classifier> AnalysisSession<C> {
    /// Open a session, creating the report directories and merging every
    /// persisted symbol table of the report.
    pub fn with_classifier(layout: ReportLayout, config: CompassConfig, classifier: C) -> Result<Self> {
        layout.ensure_dirs()?;
        let mut symbols = SymbolTable::new();
        for path in layout.symtab_files()? {
            let count = load_symbol_table(&mut symbols, &path)?;
            debug!(path = %path.display(), entries = count, "loaded symbol table");
        }
        Ok(Self {
            layout,
            config,
            classifier,
            resolver: NameResolver::new(),
            symbols,
        })
    }

    pub fn layout(&self) -> &ReportLayout {
        &self.layout
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Import and analyze one input file.
    pub fn analyze_file(&mut self, path: &Path, app: &str) -> Result<AnalysisSummary> {
        self.analyze_files(&[InputFile::new(path, app)], false)
    }

    /// Import and analyze input files together.
    ///
    /// An input already imported for the same application is an error
    /// unless `replace` is set.
    ///
    /// Every input is read and checked before any imported copy is written,
    /// so a failing input leaves the report unchanged.
    pub fn analyze_files(&mut self, inputs: &[InputFile], replace: bool) -> Result<AnalysisSummary> {
        let mut pending: Vec<PendingInput> = Vec::with_capacity(inputs.len());
        for input in inputs {
            let prepared = self.prepare_import(input, replace)?;
            // Both would be stored under the same imported copy
            let clash = pending.iter().any(|p| {
                p.header.app == prepared.header.app
                    && p.header.src_file() == prepared.header.src_file()
            });
            if clash {
                return Err(CompassError::AlreadyImported {
                    path: input.path.clone(),
                    app: input.app.clone(),
                }
                .into());
            }
            pending.push(prepared);
        }
        for input in &pending {
            self.store_import(input)?;
        }
        self.run(pending)
    }

    /// Re-run analysis of every imported copy, rebuilding capture files and
    /// symbol tables from scratch.
    pub fn reanalyze(&mut self) -> Result<AnalysisSummary> {
        self.layout.wipe_for_reanalysis()?;
        self.symbols = SymbolTable::new();

        let mut pending = Vec::new();
        for path in self.layout.import_files()? {
            let (header, text) = read_import(&path)?;
            debug!(path = %path.display(), app = %header.app, "re-reading imported input");
            pending.push(PendingInput {
                header,
                text,
                declared: SymbolTable::new(),
            });
        }
        self.run(pending)
    }

    // ========================================================================
    // Import
    // ========================================================================

    /// Read and decode an input, failing if it was imported before.
    fn prepare_import(&self, input: &InputFile, replace: bool) -> Result<PendingInput> {
        let decoded = read_input(&input.path)?;
        let input_path = input.path.display().to_string();
        let header = ImportHeader {
            input_path,
            app: input.app.clone(),
            encoding: decoded.encoding,
            batches: split_batches(&decoded.text).len() as u32,
            lines: decoded.text.lines().count() as u32,
            read_at: chrono::Local::now().format("%d-%b-%Y %H:%M:%S").to_string(),
        };

        let target = self.layout.import_file(&header.src_file(), &input.app);
        if target.exists() && !replace {
            return Err(CompassError::AlreadyImported {
                path: input.path.clone(),
                app: input.app.clone(),
            }
            .into());
        }

        Ok(PendingInput {
            header,
            text: decoded.text,
            declared: SymbolTable::new(),
        })
    }

    fn store_import(&self, input: &PendingInput) -> Result<()> {
        let header = &input.header;
        let target = self.layout.import_file(&header.src_file(), &header.app);
        write_import(&target, header, &input.text)?;
        info!(
            input = %header.input_path,
            app = %header.app,
            encoding = %header.encoding,
            batches = header.batches,
            lines = header.lines,
            "imported input file"
        );
        Ok(())
    }

    // ========================================================================
    // Passes
    // ========================================================================

    fn run(&mut self, mut pending: Vec<PendingInput>) -> Result<AnalysisSummary> {
        for input in &mut pending {
            self.declare_input(input);
        }

        let mut summary = AnalysisSummary::default();
        for input in &mut pending {
            let (records, error_batches) = self.classify_input(input)?;
            summary.files += 1;
            summary.batches += input.header.batches;
            summary.error_batches += error_batches;
            summary.lines += input.header.lines;
            summary.records += records;
        }

        info!(
            files = summary.files,
            batches = summary.batches,
            errors = summary.error_batches,
            records = summary.records,
            "analysis complete"
        );
        let normalizer = self.resolver.normalizer();
        debug!(
            attempts = normalizer.attempts(),
            hits = normalizer.hits(),
            cached = normalizer.cache_len(),
            "name normalization cache"
        );
        Ok(summary)
    }

    fn reset_resolver(&mut self) {
        self.resolver.set_current_database("");
        self.resolver.clear_context();
    }

    fn declare_input(&mut self, input: &mut PendingInput) {
        self.reset_resolver();
        for batch in split_batches(&input.text) {
            self.resolver.clear_context();
            let mut scope = AnalysisScope::new(
                &mut self.resolver,
                &mut self.symbols,
                &mut input.declared,
                &self.config,
            );
            if let BatchOutcome::SyntaxError(message) = self.classifier.declare(&batch, &mut scope) {
                debug!(file = %input.header.src_file(), batch = batch.nr, %message, "skipped batch in pass 1");
            }
        }
    }

    /// Returns the number of records written and of batches with errors.
    fn classify_input(&mut self, input: &mut PendingInput) -> Result<(usize, u32)> {
        let src_file = input.header.src_file();
        let app = input.header.app.clone();
        let mut writer = CaptureWriter::create(
            &self.layout.capture_file(&src_file, &app),
            self.layout.report_name(),
            &self.config.target_version,
        )?;

        self.reset_resolver();
        let mut error_batches = 0u32;
        for batch in split_batches(&input.text) {
            self.resolver.clear_context();
            let mut scope = AnalysisScope::new(
                &mut self.resolver,
                &mut self.symbols,
                &mut input.declared,
                &self.config,
            );
            match self.classifier.classify(&batch, &mut scope) {
                BatchOutcome::Ok => {
                    for emitted in scope.into_emitted() {
                        writer.append(&to_record(emitted, &batch, &src_file, &app))?;
                    }
                }
                BatchOutcome::SyntaxError(message) => {
                    error_batches += 1;
                    warn!(file = %src_file, batch = batch.nr, line = batch.start_line, %message, "syntax error");
                    writer.write_comment(&format!(
                        "Syntax error in batch {} starting at line {}: {}",
                        batch.nr, batch.start_line, message
                    ))?;
                }
            }
        }

        writer.write_metrics(&MetricsLine {
            src_file: src_file.clone(),
            app_name: app.clone(),
            nr_batches: input.header.batches,
            nr_error_batches: error_batches,
            nr_lines: input.header.lines,
        })?;
        let records = writer.finish()?;

        save_symbol_table(
            &input.declared,
            &self.layout.symtab_file(&src_file, &app),
            &SymbolFileHeader {
                report: self.layout.report_name(),
                app: &app,
                input: &input.header.input_path,
            },
        )?;

        info!(file = %src_file, app = %app, records, error_batches, "analyzed input file");
        Ok((records, error_batches))
    }
}

fn to_record(emitted: EmittedConstruct, batch: &Batch<'_>, src_file: &str, app: &str) -> CaptureRecord {
    let EmittedConstruct {
        construct,
        context,
        sub_context,
    } = emitted;
    CaptureRecord {
        item: construct.item,
        item_detail: construct.item_detail,
        feature_group: construct.feature_group,
        status: construct.status,
        line_nr: construct.line_nr,
        app_name: app.to_string(),
        src_file: src_file.to_string(),
        batch_nr: batch.nr,
        line_nr_in_file: batch.start_line,
        context,
        sub_context,
        misc: construct.misc,
    }
}
