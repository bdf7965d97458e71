use super::*;

/// Per-page line lists for one source document. PDFs go through
/// `pdftotext`; `.txt` sources are read directly with form feeds as page
/// breaks.
pub(super) fn load_source_pages(
    path: &Path,
    max_pages_per_doc: Option<usize>,
) -> Result<Vec<Vec<String>>> {
    let is_text = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("txt"))
        .unwrap_or(false);

    let mut pages = if is_text {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        split_pages(&raw)
    } else {
        extract_pages_with_pdftotext(path, max_pages_per_doc)?
    };

    if let Some(max_pages) = max_pages_per_doc {
        pages.truncate(max_pages);
    }

    Ok(pages.iter().map(|page| page_lines(page)).collect())
}

fn extract_pages_with_pdftotext(
    pdf_path: &Path,
    max_pages_per_doc: Option<usize>,
) -> Result<Vec<String>> {
    let mut command = Command::new("pdftotext");
    command.arg("-enc").arg("UTF-8").arg("-f").arg("1");
    if let Some(max_pages) = max_pages_per_doc {
        command.arg("-l").arg(max_pages.to_string());
    }
    command.arg(pdf_path).arg("-");

    let output = command
        .output()
        .with_context(|| format!("failed to execute pdftotext for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftotext returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    Ok(split_pages(&raw))
}

/// Form feeds separate pages in both `pdftotext` output and `.txt` sources.
pub(super) fn split_pages(raw: &str) -> Vec<String> {
    let mut pages = raw
        .split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .collect::<Vec<String>>();

    let kept = pages
        .iter()
        .rposition(|page| !page.trim().is_empty())
        .map_or(0, |last| last + 1);
    pages.truncate(kept);
    pages
}

fn page_lines(page: &str) -> Vec<String> {
    page.lines().map(ToOwned::to_owned).collect()
}

pub(super) fn collect_tool_versions() -> ToolVersions {
    ToolVersions {
        pdftotext: command_version_optional("pdftotext", &["-v"]),
    }
}

fn command_version_optional(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let source = if stdout.trim().is_empty() {
        stderr.trim()
    } else {
        stdout.trim()
    };

    source
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
}
