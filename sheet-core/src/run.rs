//! One complete generation run: validate, generate, compose, save, place.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use barcode_core::{
    CancelToken, DrawingSurface, LayoutPlan, ProgressReporter, Result, SheetComposer, SheetError,
    SymbolRenderer, generate,
};
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::job::SheetJob;
use crate::pdf::PdfSurface;
use crate::raster::{RasterImage, SymbolRasterizer};

const SCRATCH_PREFIX: &str = "barcode-sheet-";
const SCRATCH_DOCUMENT: &str = "sheet.pdf";

pub struct SheetRun {
    job: SheetJob,
    scratch_root: Option<PathBuf>,
    cancel: Option<CancelToken>,
}

impl SheetRun {
    pub fn new(job: SheetJob) -> Self {
        SheetRun {
            job,
            scratch_root: None,
            cancel: None,
        }
    }

    /// Directory under which the per-run scratch directory is created.
    /// Defaults to the system temp directory.
    pub fn scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn job(&self) -> &SheetJob {
        &self.job
    }

    /// Runs with the built-in rasterizer and returns the output path.
    pub fn execute<P>(&self, progress: &mut P) -> Result<PathBuf>
    where
        P: ProgressReporter + ?Sized,
    {
        self.execute_with(
            |scratch, job| SymbolRasterizer::new(scratch, job.symbology, job.symbol_style()),
            progress,
        )
    }

    /// Runs with a caller-built renderer. `make_renderer` receives the scratch
    /// directory, which is removed however the run ends.
    pub fn execute_with<R, F, P>(&self, make_renderer: F, progress: &mut P) -> Result<PathBuf>
    where
        R: SymbolRenderer<Image = RasterImage>,
        F: FnOnce(&Path, &SheetJob) -> R,
        P: ProgressReporter + ?Sized,
    {
        let job = &self.job;
        job.validate()?;
        check_output_dir(&job.output)?;
        let codes = generate(
            job.count,
            job.mode,
            job.code_length,
            job.start_code.as_deref(),
        )?;
        let plan = job.layout_plan()?;
        info!(
            count = codes.len(),
            columns = plan.columns,
            rows = plan.rows,
            pages = plan.page_count(codes.len()),
            "composing sheet"
        );

        let scratch = self.create_scratch()?;
        debug!(path = %scratch.path().display(), "created scratch directory");
        let result = self.compose_and_place(&codes, plan, scratch.path(), make_renderer, progress);

        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            warn!(path = %scratch_path.display(), "failed to remove scratch directory: {e}");
        } else {
            debug!(path = %scratch_path.display(), "removed scratch directory");
        }
        match &result {
            Ok(path) => info!(output = %path.display(), "sheet written"),
            Err(SheetError::Cancelled) => info!("sheet run cancelled"),
            Err(e) => warn!(kind = %e.kind(), "sheet run failed: {e}"),
        }
        result
    }

    fn create_scratch(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let dir = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    fn compose_and_place<R, F, P>(
        &self,
        codes: &[String],
        plan: LayoutPlan,
        scratch: &Path,
        make_renderer: F,
        progress: &mut P,
    ) -> Result<PathBuf>
    where
        R: SymbolRenderer<Image = RasterImage>,
        F: FnOnce(&Path, &SheetJob) -> R,
        P: ProgressReporter + ?Sized,
    {
        let job = &self.job;
        let mut composer = SheetComposer::new(plan, job.compose_options());
        if let Some(token) = &self.cancel {
            composer = composer.with_cancel(token.clone());
        }
        let mut renderer = make_renderer(scratch, job);
        let mut surface = PdfSurface::new(&job.page);
        composer.compose(codes, &mut renderer, &mut surface, progress)?;

        let document = scratch.join(SCRATCH_DOCUMENT);
        surface.save(&document)?;
        place_output(&document, &job.output)?;
        Ok(job.output.clone())
    }
}

fn check_output_dir(output: &Path) -> Result<()> {
    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => return Ok(()),
    };
    if parent.is_dir() {
        Ok(())
    } else {
        Err(SheetError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("output directory {} does not exist", parent.display()),
        )))
    }
}

/// Moves the finished document to its destination. Falls back to copying
/// when a rename is not possible, e.g. across filesystems.
fn place_output(document: &Path, output: &Path) -> Result<()> {
    if fs::rename(document, output).is_ok() {
        return Ok(());
    }
    copy_into_place(document, output)
}

fn copy_into_place(document: &Path, output: &Path) -> Result<()> {
    if let Err(e) = fs::copy(document, output) {
        let _ = fs::remove_file(output);
        return Err(e.into());
    }
    // The output is in place; the scratch copy goes with the scratch directory.
    if let Err(e) = fs::remove_file(document) {
        debug!(path = %document.display(), "left scratch document behind: {e}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use barcode_core::{ErrorKind, Mode, NoProgress};

    struct FailingRenderer {
        inner: SymbolRasterizer,
        fail_at: usize,
    }

    impl SymbolRenderer for FailingRenderer {
        type Image = RasterImage;

        fn render(&mut self, index: usize, code: &str) -> Result<RasterImage> {
            if index == self.fail_at {
                return Err(SheetError::rendering(format!("refused {code}")));
            }
            self.inner.render(index, code)
        }
    }

    fn job_in(dir: &Path, count: usize) -> SheetJob {
        let mut job = SheetJob::new(count, Mode::RandomAlphanumeric, 6);
        job.human_readable = false;
        job.px_per_module = 1;
        job.output = dir.join("sheet.pdf");
        job
    }

    fn entries(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_copy_fallback_succeeds_when_scratch_copy_cannot_be_removed() {
        let scratch = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let document = scratch.path().join(SCRATCH_DOCUMENT);
        fs::write(&document, b"%PDF-1.7\n").unwrap();
        let output = out_dir.path().join("placed.pdf");

        // A read-only scratch directory makes the removal fail for
        // unprivileged users; the output is placed all the same.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(scratch.path(), fs::Permissions::from_mode(0o555)).unwrap();
        }
        let result = copy_into_place(&document, &output);
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(scratch.path(), fs::Permissions::from_mode(0o755)).unwrap();
        }

        assert!(result.is_ok());
        assert_eq!(fs::read(&output).unwrap(), b"%PDF-1.7\n");
    }

    #[test]
    fn test_successful_run_places_output_and_cleans_scratch() {
        let out_dir = tempfile::tempdir().unwrap();
        let scratch_root = tempfile::tempdir().unwrap();
        let job = job_in(out_dir.path(), 30);
        let mut seen = Vec::new();
        let mut sink = |p: u8| seen.push(p);
        let path = SheetRun::new(job)
            .scratch_root(scratch_root.path())
            .execute(&mut sink)
            .unwrap();

        assert_eq!(path, out_dir.path().join("sheet.pdf"));
        let bytes = fs::read(&path).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.starts_with("%PDF-"));
        // 30 items at 24 per page.
        assert!(text.contains("/Count 2"));
        assert_eq!(entries(scratch_root.path()), 0);
        assert_eq!(seen.len(), 30);
        assert_eq!(seen.last(), Some(&100));
    }

    #[test]
    fn test_render_failure_mid_run_leaves_nothing_behind() {
        let out_dir = tempfile::tempdir().unwrap();
        let scratch_root = tempfile::tempdir().unwrap();
        let count = 9;
        let job = job_in(out_dir.path(), count);
        let output = job.output.clone();
        let err = SheetRun::new(job)
            .scratch_root(scratch_root.path())
            .execute_with(
                |scratch, job| FailingRenderer {
                    inner: SymbolRasterizer::new(scratch, job.symbology, job.symbol_style()),
                    // Item ceil(count / 2), counted from one.
                    fail_at: count.div_ceil(2) - 1,
                },
                &mut NoProgress,
            )
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RenderingError);
        assert_eq!(entries(scratch_root.path()), 0);
        assert!(!output.exists());
    }

    #[test]
    fn test_unencodable_codes_fail_with_rendering_error() {
        let out_dir = tempfile::tempdir().unwrap();
        let scratch_root = tempfile::tempdir().unwrap();
        let mut job = job_in(out_dir.path(), 3);
        job.mode = Mode::Sequential;
        job.code_length = 13;
        job.start_code = Some("0000000000001".to_string());
        job.symbology = crate::Symbology::Ean13;
        let output = job.output.clone();
        let err = SheetRun::new(job)
            .scratch_root(scratch_root.path())
            .execute(&mut NoProgress)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RenderingError);
        assert_eq!(entries(scratch_root.path()), 0);
        assert!(!output.exists());
    }

    #[test]
    fn test_cancelled_run_cleans_up() {
        let out_dir = tempfile::tempdir().unwrap();
        let scratch_root = tempfile::tempdir().unwrap();
        let job = job_in(out_dir.path(), 5);
        let output = job.output.clone();
        let token = CancelToken::new();
        let cancel = token.clone();
        let mut sink = |p: u8| {
            if p >= 40 {
                cancel.cancel();
            }
        };
        let err = SheetRun::new(job)
            .scratch_root(scratch_root.path())
            .cancel_token(token)
            .execute(&mut sink)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(entries(scratch_root.path()), 0);
        assert!(!output.exists());
    }

    #[test]
    fn test_invalid_job_fails_before_creating_scratch() {
        let out_dir = tempfile::tempdir().unwrap();
        let scratch_root = tempfile::tempdir().unwrap();
        let job = SheetJob::new(11, Mode::RandomDigits, 1);
        let err = SheetRun::new(SheetJob {
            output: out_dir.path().join("x.pdf"),
            ..job
        })
        .scratch_root(scratch_root.path())
        .execute(&mut NoProgress)
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationError);
        assert_eq!(entries(scratch_root.path()), 0);
    }

    #[test]
    fn test_sequential_overflow_is_reported() {
        let out_dir = tempfile::tempdir().unwrap();
        let mut job = job_in(out_dir.path(), 3);
        job.mode = Mode::Sequential;
        job.code_length = 4;
        job.start_code = Some("9998".to_string());
        let err = SheetRun::new(job).execute(&mut NoProgress).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OverflowError);
    }

    #[test]
    fn test_missing_output_directory_is_an_io_error() {
        let out_dir = tempfile::tempdir().unwrap();
        let job = job_in(&out_dir.path().join("missing"), 2);
        let err = SheetRun::new(job).execute(&mut NoProgress).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoError);
    }
}
