use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::codec::{Codec, EncodeOptions, render_matrix};
use crate::results::artifact_path;
use crate::runlog;

#[derive(Default)]
pub struct BatchStats {
    pub written: usize,
    pub failed: usize,
    pub missing: usize,
}

impl BatchStats {
    pub fn print(&self, label: &str) {
        let total = self.written + self.failed + self.missing;
        if total == 0 {
            return;
        }
        println!(
            "{label} summary: written={}, failed={}, missing={}",
            self.written, self.failed, self.missing
        );
    }
}

/// Encodes each text item to a QR image. One bad item never blocks the rest.
pub fn run_encode_batch(
    codec: &impl Codec,
    items: &[String],
    out_dir: &Path,
    options: &EncodeOptions,
) -> BatchStats {
    let mut stats = BatchStats::default();
    for item in items {
        match encode_item(codec, item, out_dir, options) {
            Ok(path) => {
                println!("encoded '{}' -> {}", preview(item), path.display());
                stats.written += 1;
                log_entry(out_dir, "encode", item, Some(&path), "written");
            }
            Err(err) => {
                eprintln!("error: failed to encode '{}': {err:#}", preview(item));
                stats.failed += 1;
                log_entry(out_dir, "encode", item, None, "failed");
            }
        }
    }
    stats
}

/// Decodes each image path to a text artifact. Missing files are skipped with
/// a message; recognition failures are reported and the loop continues.
pub fn run_decode_batch(codec: &impl Codec, items: &[String], out_dir: &Path) -> BatchStats {
    let mut stats = BatchStats::default();
    for item in items {
        let path = Path::new(item);
        if !path.exists() {
            println!("skipping {item} (no such file)");
            stats.missing += 1;
            log_entry(out_dir, "decode", item, None, "missing");
            continue;
        }
        match decode_item(codec, item, path, out_dir) {
            Ok(Some(out)) => {
                println!("decoded {item} -> {}", out.display());
                stats.written += 1;
                log_entry(out_dir, "decode", item, Some(&out), "written");
            }
            Ok(None) => {
                eprintln!("error: no QR code recognized in {item}");
                stats.failed += 1;
                log_entry(out_dir, "decode", item, None, "unrecognized");
            }
            Err(err) => {
                eprintln!("error: failed to decode {item}: {err:#}");
                stats.failed += 1;
                log_entry(out_dir, "decode", item, None, "failed");
            }
        }
    }
    stats
}

fn encode_item(
    codec: &impl Codec,
    item: &str,
    out_dir: &Path,
    options: &EncodeOptions,
) -> Result<PathBuf> {
    let matrix = codec.encode(item, options).context("building QR matrix")?;
    let image = render_matrix(&matrix, options).context("rendering QR image")?;
    let path = artifact_path(out_dir, "png");
    image
        .save(&path)
        .with_context(|| format!("saving {}", path.display()))?;
    Ok(path)
}

fn decode_item(
    codec: &impl Codec,
    item: &str,
    path: &Path,
    out_dir: &Path,
) -> Result<Option<PathBuf>> {
    let image = image::open(path)
        .with_context(|| format!("reading {}", path.display()))?
        .to_luma8();
    let Some(text) = codec.decode(&image)? else {
        return Ok(None);
    };
    let out = artifact_path(out_dir, "txt");
    fs::write(&out, format!("{item}\r\n{text}"))
        .with_context(|| format!("writing {}", out.display()))?;
    Ok(Some(out))
}

fn log_entry(out_dir: &Path, action: &str, item: &str, artifact: Option<&Path>, status: &str) {
    if let Err(err) = runlog::record(out_dir, action, &preview(item), artifact, status) {
        eprintln!("warning: unable to record run log entry: {err:#}");
    }
}

/// Shortens long work items for console and log output.
pub fn preview(text: &str) -> String {
    const MAX_CHARS: usize = 40;
    if text.chars().count() <= MAX_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX_CHARS).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{ModuleMatrix, QrCodec};
    use anyhow::bail;
    use image::GrayImage;
    use tempfile::tempdir;

    struct FlakyCodec {
        inner: QrCodec,
        poison: &'static str,
    }

    impl Codec for FlakyCodec {
        fn encode(&self, text: &str, options: &EncodeOptions) -> Result<ModuleMatrix> {
            if text == self.poison {
                bail!("synthetic encode failure");
            }
            self.inner.encode(text, options)
        }

        fn decode(&self, image: &GrayImage) -> Result<Option<String>> {
            self.inner.decode(image)
        }
    }

    fn artifacts_with_extension(dir: &Path, extension: &str) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .expect("read dir")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext == extension)
                    .unwrap_or(false)
            })
            .collect()
    }

    #[test]
    fn one_failing_item_does_not_block_the_rest() {
        let temp = tempdir().expect("temp dir");
        let codec = FlakyCodec {
            inner: QrCodec,
            poison: "boom",
        };
        let items = vec!["first".to_string(), "boom".to_string(), "third".to_string()];

        let stats = run_encode_batch(&codec, &items, temp.path(), &EncodeOptions::default());
        assert_eq!(stats.written, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(artifacts_with_extension(temp.path(), "png").len(), 2);
    }

    #[test]
    fn decode_batch_skips_missing_files() {
        let temp = tempdir().expect("temp dir");
        let items = vec![
            temp.path()
                .join("nope.png")
                .to_string_lossy()
                .into_owned(),
        ];

        let stats = run_decode_batch(&QrCodec, &items, temp.path());
        assert_eq!(stats.missing, 1);
        assert_eq!(stats.written, 0);
        assert!(artifacts_with_extension(temp.path(), "txt").is_empty());
    }

    #[test]
    fn decode_batch_writes_source_path_and_text() {
        let temp = tempdir().expect("temp dir");
        let codec = QrCodec;
        let options = EncodeOptions::default();

        let encoded = run_encode_batch(&codec, &["hello".to_string()], temp.path(), &options);
        assert_eq!(encoded.written, 1);
        let png = artifacts_with_extension(temp.path(), "png").remove(0);

        let items = vec![png.to_string_lossy().into_owned()];
        let decoded = run_decode_batch(&codec, &items, temp.path());
        assert_eq!(decoded.written, 1);

        let txt = artifacts_with_extension(temp.path(), "txt").remove(0);
        let contents = fs::read_to_string(txt).expect("read artifact");
        assert_eq!(contents, format!("{}\r\nhello", png.display()));
    }

    #[test]
    fn unreadable_image_counts_as_failure() {
        let temp = tempdir().expect("temp dir");
        let bogus = temp.path().join("not-an-image.png");
        fs::write(&bogus, "plain text").expect("write bogus");

        let items = vec![bogus.to_string_lossy().into_owned()];
        let stats = run_decode_batch(&QrCodec, &items, temp.path());
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.written, 0);
    }

    #[test]
    fn preview_truncates_long_items() {
        assert_eq!(preview("short"), "short");
        let long = "x".repeat(60);
        let shown = preview(&long);
        assert_eq!(shown.chars().count(), 43);
        assert!(shown.ends_with("..."));
    }
}
