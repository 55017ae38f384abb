//! LaTeX document skeleton for the generated sheet.
//!
//! Callers can override the preamble via [`crate::config::SheetConfig::preamble`];
//! the constant here is used only when no override is provided.

/// Default preamble: compact margins, AMS math and graphicx.
///
/// Field values already carry `\textbf`, `\textsubscript` and math delimiters,
/// so nothing beyond the standard packages is required.
pub const DEFAULT_PREAMBLE: &str = r"\documentclass[10pt]{article}
\usepackage[utf8]{inputenc}
\usepackage[T1]{fontenc}
\usepackage[margin=1.5cm]{geometry}
\usepackage{amsmath}
\usepackage{amssymb}
\usepackage{graphicx}
\setlength{\parindent}{0pt}
\setcounter{secnumdepth}{0}
";

/// `\graphicspath` line pointing LaTeX at the downloaded images.
pub fn graphics_path(image_dir: &str) -> String {
    let dir = image_dir.trim_end_matches('/');
    format!("\\graphicspath{{{{{}/}}}}\n", dir)
}
