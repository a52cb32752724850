//! Orchestrator.
//!
//! Runs the phases in a fixed order: parse, execute global code, module
//! rounds, additional functions, visit, referentialize, optional heap
//! graph, count, emit, optional strip, print. Fatal problems return `Err`;
//! recoverable ones are logged. The visit still runs after logged errors so
//! its warnings are reported too; any logged error then ends the run with
//! `Ok(None)`.

use crate::interpreter::environment::EnvironmentCutoff;
use crate::interpreter::tracer::LoggingTracer;
use crate::interpreter::{Frame, Realm, MAIN_RECORDING};
use crate::parser::{parse_source, strip_type_annotations, ParsedUnit, Printer, SourceMap};
use crate::serializer::diagnostics::{Diagnostic, DiagnosticLog, ErrorCode, SourceLocation};
use crate::serializer::error::{SerializerError, SerializerResult};
use crate::serializer::functions::extract_additional_functions;
use crate::serializer::heap_graph::HeapGraph;
use crate::serializer::lazy::LazySerializer;
use crate::serializer::modules::{ModuleReport, Modules};
use crate::serializer::naming::NameGenerator;
use crate::serializer::options::SerializerOptions;
use crate::serializer::referentializer::Referentializer;
use crate::serializer::residual_serializer::{
    serialize_pass, EagerSerializer, EmitContext, ResidualSerializer,
};
use crate::serializer::statistics::{ReactStatistics, SerializerStatistics, TimingStatistics};
use crate::serializer::value_ids::ValueIdentifiers;
use crate::serializer::visitor::ResidualHeapVisitor;
use codespan_reporting::files::SimpleFiles;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// One input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
    /// Path used in diagnostics and source maps
    pub file_path: String,
    /// Source text
    pub contents: String,
}

impl SourceUnit {
    /// Create a unit
    pub fn new(file_path: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            contents: contents.into(),
        }
    }
}

/// A successful serialization.
#[derive(Debug, Clone)]
pub struct SerializedResult {
    /// Generated source
    pub code: String,
    /// Line mappings back into the inputs
    pub source_map: Option<SourceMap>,
    /// Emission counters
    pub statistics: SerializerStatistics,
    /// Accumulated phase timings, when profiling
    pub timings: Option<TimingStatistics>,
    /// Additional function counters, when there were any
    pub react_statistics: Option<ReactStatistics>,
    /// Rendered heap graph, when requested
    pub heap_graph: Option<String>,
    /// What the module rounds initialized or delayed
    pub modules: ModuleReport,
}

/// Serializer entry point.
#[derive(Debug)]
pub struct Serializer {
    options: SerializerOptions,
    diagnostics: DiagnosticLog,
    timings: TimingStatistics,
}

impl Serializer {
    /// Create a serializer
    pub fn new(options: SerializerOptions) -> Self {
        Self {
            options,
            diagnostics: DiagnosticLog::new(),
            timings: TimingStatistics::default(),
        }
    }

    /// Options in effect
    pub fn options(&self) -> &SerializerOptions {
        &self.options
    }

    /// Diagnostics of the last run
    pub fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }

    /// Timings accumulated over every run
    pub fn timings(&self) -> &TimingStatistics {
        &self.timings
    }

    /// Codespan file database for rendering diagnostics of `units`
    pub fn files(units: &[SourceUnit]) -> SimpleFiles<String, String> {
        let mut files = SimpleFiles::new();
        for unit in units {
            files.add(unit.file_path.clone(), unit.contents.clone());
        }
        files
    }

    /// Run the whole pipeline over `units`.
    ///
    /// `Err` is fatal, `Ok(None)` means errors were logged to
    /// [`Serializer::diagnostics`].
    pub fn init(&mut self, units: &[SourceUnit]) -> SerializerResult<Option<SerializedResult>> {
        self.diagnostics.clear();
        let mut timing = TimingStatistics::default();
        let start = Instant::now();
        let result = self.run(units, &mut timing);
        timing.total = start.elapsed();
        self.timings += &timing;

        if self.options.profile {
            self.timings.log();
        }
        let profile = self.options.profile;
        let timings = self.timings.clone();
        result.map(|serialized| {
            serialized.map(|mut serialized| {
                if profile {
                    serialized.timings = Some(timings);
                }
                serialized
            })
        })
    }

    fn run(
        &mut self,
        units: &[SourceUnit],
        timing: &mut TimingStatistics,
    ) -> SerializerResult<Option<SerializedResult>> {
        let options = self.options.clone();
        let diagnostics = &mut self.diagnostics;

        let parsed = timing.measure(|t| &mut t.parse, || parse_units(units, diagnostics))?;

        let mut realm = Realm::new(options.execution_limits());
        if options.trace {
            realm.set_tracer(Box::new(LoggingTracer::new()));
        }
        timing.measure(|t| &mut t.execute, || execute(&mut realm, units, &parsed, diagnostics))?;
        let cutoff = EnvironmentCutoff(realm.envs.next_id());
        tracing::debug!(cutoff = %cutoff.0, objects = realm.heap.len(), "global code finished");

        let mut names = NameGenerator::new(
            parsed.iter().flat_map(|unit| unit.identifiers.iter().cloned()),
        );
        if let Some(runtime) = &options.lazy_objects_runtime {
            names.reserve(runtime.clone());
        }

        let modules = timing.measure(|t| &mut t.modules, || {
            Modules::new(&options, diagnostics).run(&mut realm)
        });

        let effects = timing.measure(|t| &mut t.functions, || {
            extract_additional_functions(&mut realm, cutoff, diagnostics)
        })?;
        realm.generator.end();

        let residual = timing.measure(|t| &mut t.visit, || {
            ResidualHeapVisitor::new(&realm, &effects).visit(diagnostics)
        });
        if options.internal_debug {
            residual.log();
        }
        if diagnostics.has_errors() {
            tracing::debug!(errors = diagnostics.error_count(), "discarding residual heap");
            return Ok(None);
        }

        let referentializer =
            timing.measure(|t| &mut t.referentialize, || Referentializer::new(&residual, &mut names));
        if options.internal_debug {
            referentializer.log();
        }

        let heap_graph = match options.heap_graph_format {
            Some(format) => Some(timing.measure(|t| &mut t.heap_graph, || {
                HeapGraph::build(&realm, &residual).render(format)
            })?),
            None => None,
        };

        let serializer: Box<dyn ResidualSerializer> = match &options.lazy_objects_runtime {
            Some(runtime) => Box::new(LazySerializer::new(runtime.clone())),
            None => Box::new(EagerSerializer),
        };
        let context = EmitContext {
            realm: &realm,
            residual: &residual,
            referentializer: &referentializer,
            effects: &effects,
        };
        let mut table = ValueIdentifiers::new();
        if options.inline_expressions {
            table.init_pass1();
            timing.measure(|t| &mut t.count, || {
                serialize_pass(serializer.as_ref(), &context, &mut table, names.clone())
            })?;
            table.init_pass2()?;
        } else {
            table.finalize_conservative();
        }
        if options.internal_debug {
            table.log();
        }
        let mut output = timing.measure(|t| &mut t.serialize, || {
            serialize_pass(serializer.as_ref(), &context, &mut table, names)
        })?;

        if options.strip_type_annotations {
            timing.measure(|t| &mut t.strip, || strip_type_annotations(&mut output.program));
        }

        let sources = options
            .source_maps
            .then(|| units.iter().map(|unit| unit.file_path.clone()).collect());
        let (code, source_map) =
            timing.measure(|t| &mut t.print, || Printer::new(sources).print(&output.program));

        if options.log_statistics {
            output.statistics.log();
        }
        if diagnostics.has_errors() {
            return Ok(None);
        }

        let react_statistics = (!effects.is_empty()).then_some(output.react);
        Ok(Some(SerializedResult {
            code,
            source_map,
            statistics: output.statistics,
            timings: None,
            react_statistics,
            heap_graph,
            modules,
        }))
    }
}

fn parse_units(
    units: &[SourceUnit],
    diagnostics: &mut DiagnosticLog,
) -> SerializerResult<Vec<ParsedUnit>> {
    let mut parsed = Vec::with_capacity(units.len());
    for (index, unit) in units.iter().enumerate() {
        match parse_source(&unit.contents, index) {
            Ok(program) => parsed.push(program),
            Err(error) => {
                diagnostics.push(
                    Diagnostic::error(ErrorCode::PARSE, error.message.clone())
                        .at(SourceLocation::new(index, error.span)),
                );
                return Err(SerializerError::Fatal {
                    code: ErrorCode::PARSE.0,
                    message: format!("{}: {}", unit.file_path, error.message),
                });
            }
        }
    }
    Ok(parsed)
}

/// Run every unit inside the main recording session.
fn execute(
    realm: &mut Realm,
    units: &[SourceUnit],
    parsed: &[ParsedUnit],
    diagnostics: &mut DiagnosticLog,
) -> SerializerResult<()> {
    realm.generator.begin(MAIN_RECORDING);
    for (unit, program) in units.iter().zip(parsed) {
        let _span = tracing::debug_span!("execute", file = %unit.file_path).entered();
        if let Err(thrown) = realm.run_program(&program.program) {
            let frame = Frame::Diagnostic { reason: format!("global code of {}", unit.file_path) };
            return realm.with_frame(frame, |realm| {
                let reasons: Vec<String> = realm
                    .frames()
                    .iter()
                    .filter_map(|frame| match frame {
                        Frame::Diagnostic { reason } => Some(reason.clone()),
                        Frame::Function { .. } => None,
                    })
                    .collect();
                let message = format!("global code completed abruptly: {}", thrown);
                diagnostics.push(
                    Diagnostic::error(ErrorCode::ABRUPT_COMPLETION, message.clone())
                        .with_note(format!("while running {}", reasons.join(", "))),
                );
                Err(SerializerError::Fatal {
                    code: ErrorCode::ABRUPT_COMPLETION.0,
                    message,
                })
            });
        }
    }
    Ok(())
}
