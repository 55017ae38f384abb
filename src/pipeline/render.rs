//! LaTeX emission: section hierarchy + records → one `.tex` document.
//!
//! Section titles and record names come from page metadata and are escaped.
//! Field values were produced by the extractor already in LaTeX form and are
//! written verbatim.

use crate::error::SheetError;
use crate::images::ConverterCommand;
use crate::output::{DistributionRecord, SectionOutput};
use crate::pipeline::image::display_caption;
use crate::pipeline::inline::normalize;
use crate::pipeline::links::strip_link_tags;
use crate::preamble::graphics_path;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// Sectioning command for an outline entry at `depth` (1 = `\section`).
///
/// LaTeX has no level below `\subsubsection`; deeper entries become
/// `\paragraph`.
pub fn section_command(title: &str, depth: usize) -> String {
    let title = escape_latex(title);
    match depth {
        0..=3 => format!(
            "\\{}section{{{}}}",
            "sub".repeat(depth.saturating_sub(1)),
            title
        ),
        _ => format!("\\paragraph{{{}}}", title),
    }
}

/// Heading for a distribution: one level below the section listing it.
pub fn distribution_command(record: &DistributionRecord) -> String {
    section_command(&record.name, record.depth + 1)
}

/// Render one record: heading, field list and optional figure.
pub fn render_record(record: &DistributionRecord) -> String {
    let mut out = distribution_command(record);
    out.push('\n');

    let fields = record.labelled_fields();
    if !fields.is_empty() {
        out.push_str("\\begin{description}\n");
        for (label, value) in fields {
            out.push_str(&format!("  \\item[{}] {}\n", label, value));
        }
        out.push_str("\\end{description}\n");
    }

    if let Some(ref img) = record.image {
        out.push_str("\\begin{center}\n");
        out.push_str(&format!(
            "\\includegraphics[width=0.6\\linewidth]{{{}}}",
            img.filename
        ));
        if let Some(text) = display_caption(img) {
            let caption = strip_link_tags(&normalize(text));
            if !caption.trim().is_empty() {
                out.push_str(&format!("\\\\\n{{\\small {}}}", caption.trim()));
            }
        }
        out.push_str("\n\\end{center}\n");
    }

    out
}

/// Render a section, its records and its subsections.
pub fn render_section(section: &SectionOutput) -> String {
    let mut out = section_command(&section.title, section.depth);
    out.push_str("\n\n");
    for record in &section.records {
        out.push_str(&render_record(record));
        out.push('\n');
    }
    for sub in &section.subsections {
        out.push_str(&render_section(sub));
    }
    out
}

/// Assemble the full document.
pub fn render_document(sections: &[SectionOutput], preamble: &str, image_dir: &str) -> String {
    let mut out = String::with_capacity(preamble.len() + 4096);
    out.push_str(preamble);
    if !preamble.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&graphics_path(image_dir));
    out.push_str("\n\\begin{document}\n\n");
    for section in sections {
        out.push_str(&render_section(section));
    }
    out.push_str("\\end{document}\n");
    out
}

/// Run the typesetting `engine` over `tex_path` in its own directory.
///
/// The job name is the file stem, so `sheet.tex` produces `sheet.pdf` next
/// to it. Spawn failure or a non-zero exit becomes
/// [`SheetError::TypesetFailed`] carrying the tail of the engine's log.
pub async fn typeset(tex_path: &Path, engine: &str) -> Result<(), SheetError> {
    let fail = |detail: String| SheetError::TypesetFailed {
        path: tex_path.to_path_buf(),
        engine: engine.to_string(),
        detail,
    };

    let stem = tex_path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| fail("path has no file stem".into()))?;
    let file_name = tex_path
        .file_name()
        .ok_or_else(|| fail("path has no file name".into()))?;
    let dir = match tex_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    info!("Typesetting {} with {}", tex_path.display(), engine);
    let output = Command::new(engine)
        .arg("-interaction=nonstopmode")
        .arg(format!("-jobname={}", stem))
        .arg(file_name)
        .current_dir(dir)
        .output()
        .await
        .map_err(|e| fail(e.to_string()))?;

    let log = String::from_utf8_lossy(&output.stdout);
    debug!("{} output:\n{}", engine, log);

    if !output.status.success() {
        let tail: Vec<&str> = log.lines().rev().take(10).collect();
        let tail: Vec<&str> = tail.into_iter().rev().collect();
        return Err(fail(format!("{}: {}", output.status, tail.join("\n"))));
    }
    Ok(())
}

/// Escape LaTeX special characters in plain text.
pub fn escape_latex(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\textbackslash{}"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '$' => out.push_str("\\$"),
            '&' => out.push_str("\\&"),
            '%' => out.push_str("\\%"),
            '#' => out.push_str("\\#"),
            '_' => out.push_str("\\_"),
            '^' => out.push_str("\\textasciicircum{}"),
            '~' => out.push_str("\\textasciitilde{}"),
            _ => out.push(ch),
        }
    }
    out
}

/// Lays four sheet pages side by side on one landscape page.
pub const DEFAULT_IMPOSE_COMMAND: &str = "pdfjam --batch --nup 4x1 --landscape {input} -o {output}";

/// Where the imposed copy of a typeset sheet goes: `sheet.tex` → `sheet-4up.pdf`.
pub fn imposed_path(tex_path: &Path) -> PathBuf {
    let stem = tex_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sheet".into());
    tex_path.with_file_name(format!("{}-4up.pdf", stem))
}

/// Run the imposition `command` over a typeset PDF.
///
/// Failures are reported as [`SheetError::TypesetFailed`] naming the
/// command's program.
pub async fn impose(
    pdf_path: &Path,
    output: &Path,
    command: &ConverterCommand,
) -> Result<(), SheetError> {
    info!("Imposing {} into {}", pdf_path.display(), output.display());
    let log = command
        .run(pdf_path, output)
        .await
        .map_err(|e| SheetError::TypesetFailed {
            path: pdf_path.to_path_buf(),
            engine: command.program.clone(),
            detail: e.to_string(),
        })?;
    debug!("{} output:\n{}", command.program, log);
    Ok(())
}
