//! Figure download and vector→raster conversion.
//!
//! pdflatex cannot include SVG, so vector images are handed to an external
//! converter after download. The converter is a plain command line with
//! `{input}` and `{output}` placeholders, `svgexport {input} {output} 1x` by
//! default.

use crate::error::ImageError;
use crate::output::ImageReference;
use crate::wiki::PageSource;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tokio::process::Command;
use tracing::{debug, info};

/// External command turning one file into another, e.g. SVG into PNG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for ConverterCommand {
    fn default() -> Self {
        Self {
            program: "svgexport".into(),
            args: vec!["{input}".into(), "{output}".into(), "1x".into()],
        }
    }
}

impl FromStr for ConverterCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace().map(str::to_string);
        let program = words.next().ok_or("converter command is empty")?;
        let args: Vec<String> = words.collect();
        if !args.iter().any(|a| a.contains("{input}")) {
            return Err(format!("converter '{}' has no {{input}} placeholder", s));
        }
        if !args.iter().any(|a| a.contains("{output}")) {
            return Err(format!("converter '{}' has no {{output}} placeholder", s));
        }
        Ok(Self { program, args })
    }
}

impl fmt::Display for ConverterCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

impl ConverterCommand {
    /// Arguments with the placeholders filled in.
    pub fn resolve_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|a| a.replace("{input}", &input).replace("{output}", &output))
            .collect()
    }

    /// Run the converter, returning its combined output on success.
    pub async fn run(&self, input: &Path, output: &Path) -> Result<String, ImageError> {
        let fail = |detail: String| ImageError::Convert {
            program: self.program.clone(),
            input: input.to_path_buf(),
            detail,
        };

        let result = Command::new(&self.program)
            .args(self.resolve_args(input, output))
            .output()
            .await
            .map_err(|e| fail(e.to_string()))?;

        let mut log = String::from_utf8_lossy(&result.stdout).into_owned();
        log.push_str(&String::from_utf8_lossy(&result.stderr));
        if !result.status.success() {
            return Err(fail(format!("{}: {}", result.status, log.trim())));
        }
        Ok(log)
    }
}

/// File name used on disk: spaces become underscores so LaTeX can include it.
pub fn local_filename(filename: &str) -> String {
    filename.trim().replace(' ', "_")
}

/// Same name with a `.png` extension.
pub fn raster_filename(filename: &str) -> String {
    match filename.rfind('.') {
        Some(dot) => format!("{}.png", &filename[..dot]),
        None => format!("{}.png", filename),
    }
}

/// Download `image` into `dir` and convert it when it is a vector format.
///
/// On success `image.filename` names the file LaTeX should include. On
/// failure the reference is left untouched.
pub async fn download(
    source: &dyn PageSource,
    image: &mut ImageReference,
    dir: &Path,
    converter: &ConverterCommand,
) -> Result<(), ImageError> {
    let url = source.image_url(&image.filename).await?;
    let bytes = source.fetch_bytes(&url).await?;

    let local = local_filename(&image.filename);
    let path = dir.join(&local);
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ImageError::Write {
            path: dir.to_path_buf(),
            source: e,
        })?;
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| ImageError::Write {
            path: path.clone(),
            source: e,
        })?;
    debug!("Saved {} ({} bytes)", path.display(), bytes.len());

    if image.is_vector() {
        let png = raster_filename(&local);
        let log = converter.run(&path, &dir.join(&png)).await?;
        info!("{} output: {}", converter.program, log.trim());
        image.filename = png;
    } else {
        image.filename = local;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use crate::wiki::ParsedPage;

    struct OneImage;

    impl PageSource for OneImage {
        fn fetch_parse_tree<'a>(
            &'a self,
            identifier: &'a str,
        ) -> BoxFuture<'a, Result<ParsedPage, FetchError>> {
            async move {
                Err(FetchError::NotFound {
                    page: identifier.to_string(),
                })
            }
            .boxed()
        }

        fn fetch_list_html<'a>(&'a self, page: &'a str) -> BoxFuture<'a, Result<String, FetchError>> {
            async move {
                Err(FetchError::NotFound {
                    page: page.to_string(),
                })
            }
            .boxed()
        }

        fn image_url<'a>(&'a self, filename: &'a str) -> BoxFuture<'a, Result<String, FetchError>> {
            async move {
                if filename.starts_with("Missing") {
                    Err(FetchError::NotFound {
                        page: format!("File:{}", filename),
                    })
                } else {
                    Ok(format!("https://upload.example/{}", filename))
                }
            }
            .boxed()
        }

        fn fetch_bytes<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>> {
            async move { Ok(b"<svg/>".to_vec()) }.boxed()
        }
    }

    #[test]
    fn default_converter_is_svgexport() {
        let c = ConverterCommand::default();
        assert_eq!(c.to_string(), "svgexport {input} {output} 1x");
        assert_eq!(
            c.resolve_args(Path::new("images/a.svg"), Path::new("images/a.png")),
            vec!["images/a.svg", "images/a.png", "1x"]
        );
    }

    #[test]
    fn converter_parse_requires_placeholders() {
        let c: ConverterCommand = "rsvg-convert -o {output} {input}".parse().unwrap();
        assert_eq!(c.program, "rsvg-convert");
        assert!("".parse::<ConverterCommand>().is_err());
        assert!("inkscape {input}".parse::<ConverterCommand>().is_err());
    }

    #[test]
    fn file_names() {
        assert_eq!(local_filename("Beta distribution pdf.svg"), "Beta_distribution_pdf.svg");
        assert_eq!(raster_filename("beta.pdf.svg"), "beta.pdf.png");
        assert_eq!(raster_filename("noext"), "noext.png");
    }

    #[tokio::test]
    async fn raster_image_is_saved_under_local_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut img = ImageReference::new("Normal pdf.png", "pdf");
        download(&OneImage, &mut img, dir.path(), &ConverterCommand::default())
            .await
            .unwrap();
        assert_eq!(img.filename, "Normal_pdf.png");
        assert!(dir.path().join("Normal_pdf.png").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn vector_image_is_converted() {
        let dir = tempfile::tempdir().unwrap();
        let mut img = ImageReference::new("Beta.svg", "pdf");
        let copy: ConverterCommand = "cp {input} {output}".parse().unwrap();
        download(&OneImage, &mut img, dir.path(), &copy).await.unwrap();
        assert_eq!(img.filename, "Beta.png");
        assert!(dir.path().join("Beta.svg").exists());
        assert!(dir.path().join("Beta.png").exists());
    }

    #[tokio::test]
    async fn failed_conversion_keeps_reference() {
        let dir = tempfile::tempdir().unwrap();
        let mut img = ImageReference::new("Beta.svg", "pdf");
        let missing: ConverterCommand = "distsheet-no-such-converter {input} {output}"
            .parse()
            .unwrap();
        let err = download(&OneImage, &mut img, dir.path(), &missing)
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::Convert { .. }));
        assert_eq!(img.filename, "Beta.svg");
    }

    #[tokio::test]
    async fn unknown_file_is_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut img = ImageReference::new("Missing.svg", "");
        let err = download(&OneImage, &mut img, dir.path(), &ConverterCommand::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::Fetch(FetchError::NotFound { .. })));
    }
}
