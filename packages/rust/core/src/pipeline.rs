//! End-to-end run: page directory → per-tier tables → CSVs, logs, cross-checks.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use tallycheck_aggregate::{
    AggregatedTable, SummaryBuilder, SummaryView, ValidationReport, cross_validate,
};
use tallycheck_artifacts::{
    CrossCheckDocument, TierStats, render_cross_check_json, write_check_section, write_csv,
    write_summary_section,
};
use tallycheck_extract::TableExtractor;
use tallycheck_shared::{Result, RunConfig, TallycheckError, Tier, TiersConfig};

/// Summary log file name inside the results directory.
const SUMMARY_LOG: &str = "summary.log";

/// Cross-check log file name inside the results directory.
const CHECK_LOG: &str = "check-summary.log";

/// Machine-readable cross-check report file name.
const CHECK_JSON: &str = "cross-check.json";

/// A document that was skipped.
#[derive(Debug, Clone)]
pub struct DocumentError {
    /// File name of the document.
    pub document: String,
    /// Rendered error.
    pub message: String,
}

/// Everything produced for one tier.
#[derive(Debug)]
pub struct TierOutcome {
    pub tier: Tier,
    /// File name pattern the documents were selected by.
    pub pattern: String,
    /// Primary pattern that yielded nothing, when the fallback pattern was used.
    pub fallback_from: Option<String>,
    /// Merged table of every successfully extracted document.
    pub table: AggregatedTable,
    /// Roll-up view used for reporting and cross-validation.
    pub summary: SummaryView,
    /// Number of documents read, under the primary and any fallback pattern.
    pub documents: usize,
    /// Documents skipped because extraction failed, under every attempted pattern.
    pub errors: Vec<DocumentError>,
    /// Merge writes that met a different existing count.
    pub conflicts: usize,
}

/// Result of a full run.
#[derive(Debug)]
pub struct RunResult {
    /// Tier outcomes in top, territorial, precinct order.
    pub tiers: Vec<TierOutcome>,
    /// Cross-validation reports, one per tier pair; empty when disabled.
    pub reports: Vec<ValidationReport>,
    /// Directory the artifacts were written to.
    pub results_dir: PathBuf,
    /// Total elapsed time.
    pub elapsed: Duration,
}

impl RunResult {
    pub fn tier(&self, tier: Tier) -> Option<&TierOutcome> {
        self.tiers.iter().find(|outcome| outcome.tier == tier)
    }

    /// Documents skipped across all tiers.
    pub fn error_count(&self) -> usize {
        self.tiers.iter().map(|outcome| outcome.errors.len()).sum()
    }

    /// Merge conflicts across all tiers.
    pub fn conflict_count(&self) -> usize {
        self.tiers.iter().map(|outcome| outcome.conflicts).sum()
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a document has been extracted and merged.
    fn document_parsed(&self, name: &str, current: usize, total: usize);
    /// Called when a document is skipped.
    fn document_failed(&self, name: &str, error: &TallycheckError);
    /// Called with each log section right after it is flushed to disk.
    fn report(&self, text: &str);
    /// Called when the pipeline completes.
    fn done(&self, result: &RunResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn document_parsed(&self, _name: &str, _current: usize, _total: usize) {}
    fn document_failed(&self, _name: &str, _error: &TallycheckError) {}
    fn report(&self, _text: &str) {}
    fn done(&self, _result: &RunResult) {}
}

/// Run the full pipeline.
///
/// 1. Parse each tier's documents (parallel extraction, ordered merge)
/// 2. Fall back to the secondary precinct pattern if the primary one is empty
/// 3. Write one CSV per tier
/// 4. Build roll-up views and write the summary log
/// 5. Cross-validate tier pairs and write the cross-check log and JSON report
#[instrument(skip_all, fields(page_dir = %config.page_dir.display()))]
pub async fn run(config: &RunConfig, progress: &dyn ProgressReporter) -> Result<RunResult> {
    let start = Instant::now();

    std::fs::create_dir_all(&config.results_dir)
        .map_err(|e| TallycheckError::io(&config.results_dir, e))?;

    let extractor = Arc::new(TableExtractor::new(config.extract.clone()));
    let mut tiers = Vec::with_capacity(Tier::ALL.len());

    // --- Phase 1: Extract and merge ---
    for tier in Tier::ALL {
        let mut outcome =
            parse_tier(config, &extractor, tier, config.tiers.pattern(tier), progress).await?;
        let mut include_leaf_level = true;

        if tier == Tier::Precinct && outcome.table.is_empty() {
            info!(
                primary = %outcome.pattern,
                fallback = %config.tiers.precinct_fallback,
                "precinct tier empty, trying fallback pattern"
            );
            let primary = outcome;
            outcome = parse_tier(
                config,
                &extractor,
                tier,
                &config.tiers.precinct_fallback,
                progress,
            )
            .await?;
            outcome.documents += primary.documents;
            outcome.conflicts += primary.conflicts;
            let mut errors = primary.errors;
            errors.append(&mut outcome.errors);
            outcome.errors = errors;
            outcome.fallback_from = Some(primary.pattern);
            include_leaf_level = false;
        }

        let csv_path = config.results_dir.join(TiersConfig::csv_name(tier));
        write_table(&csv_path, &outcome.table)?;

        outcome.summary = if config.cross_validate {
            SummaryBuilder::new(include_leaf_level).build(&outcome.table)
        } else {
            SummaryView::totals_only(&outcome.table)
        };

        info!(
            %tier,
            documents = outcome.documents,
            errors = outcome.errors.len(),
            conflicts = outcome.conflicts,
            paths = outcome.table.len(),
            prefixes = outcome.summary.len(),
            "tier aggregated"
        );

        tiers.push(outcome);
    }

    // --- Phase 2: Summary log ---
    progress.phase("Writing summaries");
    let summary_path = config.results_dir.join(SUMMARY_LOG);
    let mut summary_log = create_file(&summary_path)?;
    for outcome in &tiers {
        let mut section = Vec::new();
        write_summary_section(&mut section, outcome.tier, &outcome.summary)
            .map_err(|e| TallycheckError::io(&summary_path, e))?;
        emit_section(&mut summary_log, &summary_path, &section, progress)?;
    }

    // --- Phase 3: Cross-validation ---
    let mut reports = Vec::new();
    let check_path = config.results_dir.join(CHECK_LOG);
    let mut check_log = create_file(&check_path)?;

    if config.cross_validate {
        progress.phase("Cross-checking tiers");
        for (left, right) in Tier::pairs() {
            let (Some(l), Some(r)) = (find_tier(&tiers, left), find_tier(&tiers, right)) else {
                continue;
            };
            let report = cross_validate(left, &l.summary, right, &r.summary);

            let mut section = Vec::new();
            write_check_section(&mut section, &report)
                .map_err(|e| TallycheckError::io(&check_path, e))?;
            emit_section(&mut check_log, &check_path, &section, progress)?;

            if !report.is_clean() {
                warn!(
                    %left,
                    %right,
                    mismatches = report.mismatches.len(),
                    "tier totals disagree"
                );
            }
            reports.push(report);
        }
    }

    write_json_report(config, &tiers, &reports)?;

    let result = RunResult {
        tiers,
        reports,
        results_dir: config.results_dir.clone(),
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        errors = result.error_count(),
        conflicts = result.conflict_count(),
        reports = result.reports.len(),
        elapsed_ms = result.elapsed.as_millis(),
        "run complete"
    );

    Ok(result)
}

// ---------------------------------------------------------------------------
// Tier parsing
// ---------------------------------------------------------------------------

/// Extract every document of one tier and merge the fragments in file name order.
#[instrument(skip_all, fields(%tier, %pattern))]
async fn parse_tier(
    config: &RunConfig,
    extractor: &Arc<TableExtractor>,
    tier: Tier,
    pattern: &str,
    progress: &dyn ProgressReporter,
) -> Result<TierOutcome> {
    let documents = list_documents(&config.page_dir, pattern)?;
    let total = documents.len();
    progress.phase(&format!("Parsing {tier} pages ({total} documents)"));

    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let handles: Vec<_> = documents
        .iter()
        .map(|path| {
            tokio::spawn(extract_task(
                semaphore.clone(),
                extractor.clone(),
                path.clone(),
            ))
        })
        .collect();

    // Fragments are merged in file name order: overwrites depend on it.
    let mut table = AggregatedTable::with_policy(config.merge_policy);
    let mut errors = Vec::new();
    let mut conflicts = 0;

    for (i, (path, handle)) in documents.iter().zip(handles).enumerate() {
        let name = document_name(path);
        let extracted = handle
            .await
            .unwrap_or_else(|e| Err(TallycheckError::Task(e.to_string())));

        match extracted {
            Ok(fragment) => {
                let outcome = table.merge(&fragment);
                for conflict in &outcome.conflicts {
                    warn!(
                        document = %name,
                        path = %conflict.path,
                        label = %conflict.label,
                        previous = conflict.previous,
                        incoming = conflict.incoming,
                        policy = ?table.policy(),
                        "conflicting count for the same location"
                    );
                }
                conflicts += outcome.conflicts.len();
                debug!(document = %name, facts = outcome.facts, "document merged");
                progress.document_parsed(&name, i + 1, total);
            }
            Err(e) => {
                warn!(document = %name, error = %e, "skipping document");
                progress.document_failed(&name, &e);
                errors.push(DocumentError {
                    document: name,
                    message: e.to_string(),
                });
            }
        }
    }

    Ok(TierOutcome {
        tier,
        pattern: pattern.to_string(),
        fallback_from: None,
        table,
        summary: SummaryView::default(),
        documents: total,
        errors,
        conflicts,
    })
}

async fn extract_task(
    semaphore: Arc<Semaphore>,
    extractor: Arc<TableExtractor>,
    path: PathBuf,
) -> Result<AggregatedTable> {
    let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|e| TallycheckError::Task(e.to_string()))?;

    tokio::task::spawn_blocking(move || extract_document(&extractor, &path))
        .await
        .map_err(|e| TallycheckError::Task(e.to_string()))?
}

/// Read and extract a single document.
pub fn extract_document(extractor: &TableExtractor, path: &Path) -> Result<AggregatedTable> {
    let bytes = std::fs::read(path).map_err(|e| TallycheckError::io(path, e))?;
    let html = String::from_utf8_lossy(&bytes);
    extractor.extract_html(&html)
}

/// Files in `dir` whose name contains `pattern`, sorted by name.
pub fn list_documents(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| TallycheckError::io(dir, e))?;

    let mut documents = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| TallycheckError::io(dir, e))?;
        let path = entry.path();
        let matches = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().contains(pattern));
        if matches && path.is_file() {
            documents.push(path);
        }
    }

    documents.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(documents)
}

fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn find_tier(tiers: &[TierOutcome], tier: Tier) -> Option<&TierOutcome> {
    tiers.iter().find(|outcome| outcome.tier == tier)
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn create_file(path: &Path) -> Result<File> {
    File::create(path).map_err(|e| TallycheckError::io(path, e))
}

fn write_table(path: &Path, table: &AggregatedTable) -> Result<()> {
    write_csv(table, create_file(path)?).map_err(|e| TallycheckError::io(path, e))?;
    debug!(path = %path.display(), rows = table.len(), "csv written");
    Ok(())
}

/// Append one rendered section to a log file, flush it, and hand it to the reporter.
fn emit_section(
    file: &mut File,
    path: &Path,
    section: &[u8],
    progress: &dyn ProgressReporter,
) -> Result<()> {
    file.write_all(section)
        .and_then(|()| file.flush())
        .map_err(|e| TallycheckError::io(path, e))?;
    progress.report(&String::from_utf8_lossy(section));
    Ok(())
}

fn write_json_report(
    config: &RunConfig,
    tiers: &[TierOutcome],
    reports: &[ValidationReport],
) -> Result<()> {
    let stats: Vec<TierStats> = tiers
        .iter()
        .map(|outcome| TierStats {
            tier: outcome.tier,
            pattern: outcome.pattern.clone(),
            fallback_from: outcome.fallback_from.clone(),
            documents: outcome.documents,
            errors: outcome.errors.len(),
            conflicts: outcome.conflicts,
            paths: outcome.table.len(),
        })
        .collect();

    let doc = CrossCheckDocument {
        generated_at: chrono::Utc::now(),
        cross_validate: config.cross_validate,
        tiers: &stats,
        reports,
    };

    let path = config.results_dir.join(CHECK_JSON);
    let json = render_cross_check_json(&doc)
        .map_err(|e| TallycheckError::validation(format!("cross-check report: {e}")))?;
    std::fs::write(&path, json).map_err(|e| TallycheckError::io(&path, e))
}
