use crate::cache::{ResultCacheKey, ResultCacheValue};
use crate::config::LayoutProfile;
use crate::error::ExtractError;
use crate::extraction::ExtractionSession;
use crate::layout::{FragmentStream, LayoutBackend, LayoutEngine};
use crate::storage::{FileStorage, NoOpStorage, ResultStorage};
use crate::types::{ExtractionResult, PageFragments, RowDump};
use anyhow::Result;
use std::path::Path;
use std::time::{Duration, Instant};

/// Captured intermediate outputs from each pipeline stage
/// Used for testing and diagnostics: lets you inspect what each boundary produced
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExtractionStages {
    pub pages: Vec<PageFragments>,
    pub rows: Vec<RowDump>,
    pub result: ExtractionResult,
}

/// Options for a single `process_file` run
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessOptions {
    pub profiling: bool,
    pub skip_cache: bool,
}

/// Simple profiler that collects timings for pipeline steps
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        tracing::debug!("{}: {}ms", step_name, elapsed.as_millis());
        self.timings.push((step_name.to_string(), elapsed));

        result
    }

    pub fn timings(&self) -> &[(String, Duration)] {
        &self.timings
    }

    pub fn print_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        println!("\n📊 Performance Summary:");
        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();

        for (step, duration) in &self.timings {
            let percentage = if total.is_zero() {
                0.0
            } else {
                (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            };
            println!(
                "   {:.<35} {:.0}ms ({:.1}%)",
                step,
                duration.as_millis(),
                percentage
            );
        }
        println!("   {:.<35} {:.0}ms", "Total", total.as_millis());
    }
}

/// Run one document through an extraction session, page by page.
///
/// An engine failure on any page aborts the document; nothing is returned
/// for the pages that did succeed.
pub fn extract<E: LayoutEngine>(
    engine: E,
    profile: &LayoutProfile,
) -> Result<ExtractionResult, ExtractError> {
    extract_with_profiler(engine, profile, &mut StepProfiler::new(false))
}

fn extract_with_profiler<E: LayoutEngine>(
    engine: E,
    profile: &LayoutProfile,
    profiler: &mut StepProfiler,
) -> Result<ExtractionResult, ExtractError> {
    let mut session = ExtractionSession::new(profile)?;
    tracing::info!("extracting with engine '{}', profile '{}'", engine.name(), profile.name);

    for page in FragmentStream::new(engine, profile.page_stride) {
        let page = page?;
        let step = format!("Page {}", page.page_index + 1);
        profiler.time_step(&step, || session.process_page(page));
    }

    Ok(profiler.time_step("Finish", || session.finish()))
}

pub struct DocumentProcessor {
    storage: Box<dyn ResultStorage + Send + Sync>,
}

impl DocumentProcessor {
    /// Create DocumentProcessor with full dependency injection
    pub fn new_with_dependencies(storage: Box<dyn ResultStorage + Send + Sync>) -> Self {
        Self { storage }
    }

    /// Convenience constructor for CLI with a file cache
    pub fn new_cli_with_cache(cache_dir: &str) -> Result<Self> {
        Ok(Self::new_with_dependencies(Box::new(FileStorage::new(
            cache_dir,
        )?)))
    }

    /// Processor that never caches
    pub fn new_without_cache() -> Self {
        Self::new_with_dependencies(Box::new(NoOpStorage::new()))
    }

    /// Extract from an engine the caller already built; no caching.
    pub fn extract<E: LayoutEngine>(
        &self,
        engine: E,
        profile: &LayoutProfile,
    ) -> Result<ExtractionResult> {
        Ok(extract(engine, profile)?)
    }

    /// Extract a layout file (`.json` or bbox `.xhtml`), consulting the result cache.
    pub fn process_file(
        &mut self,
        input_path: &str,
        profile: &LayoutProfile,
        options: ProcessOptions,
    ) -> Result<ExtractionResult> {
        let start_time = Instant::now();
        let mut profiler = StepProfiler::new(options.profiling);

        let (content, cache_key) = profiler.time_step("Cache Key Generation", || {
            let bytes = std::fs::read(input_path)?;
            let key = ResultCacheKey::for_document(&bytes, profile)?;
            Ok::<_, anyhow::Error>((bytes, key))
        })?;

        let cached = if options.skip_cache {
            tracing::info!("skipping cache lookup");
            None
        } else {
            profiler.time_step("Cache Lookup", || self.storage.get_result(&cache_key))?
        };

        if let Some(cached) = cached {
            tracing::info!("cache hit for {} with profile '{}'", input_path, profile.name);
            profiler.print_summary();
            return Ok(cached.result);
        }

        tracing::info!("processing {}", input_path);
        let content = String::from_utf8(content)
            .map_err(|e| ExtractError::Document(format!("{} is not UTF-8: {}", input_path, e)))?;
        let backend = LayoutBackend::for_file(Path::new(input_path), content)?;
        let result = extract_with_profiler(backend, profile, &mut profiler)?;

        if !options.skip_cache {
            profiler.time_step("Cache Storage", || {
                let processing_time = start_time.elapsed().as_millis() as u64;
                let cache_value = ResultCacheValue::new(cache_key.clone(), result.clone(), processing_time);
                self.storage.store_result(&cache_key, &cache_value)
            })?;
        }

        profiler.print_summary();
        tracing::info!(
            "extracted {} pages in {}ms",
            result.page_count,
            start_time.elapsed().as_millis()
        );
        Ok(result)
    }

    /// Process a layout file and capture every intermediate stage.
    /// Bypasses the cache.
    pub fn capture_stages(
        &mut self,
        input_path: &str,
        profile: &LayoutProfile,
    ) -> Result<ExtractionStages> {
        let content = std::fs::read_to_string(input_path)?;
        let backend = LayoutBackend::for_file(Path::new(input_path), content)?;

        let pages = FragmentStream::new(backend, profile.page_stride)
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!("captured {} pages of fragments", pages.len());

        let mut session = ExtractionSession::new(profile)?;
        for page in pages.iter().cloned() {
            session.process_page(page);
        }
        let rows = session.rows().dump();
        tracing::debug!("captured {} rows", rows.len());

        Ok(ExtractionStages {
            pages,
            rows,
            result: session.finish(),
        })
    }
}
