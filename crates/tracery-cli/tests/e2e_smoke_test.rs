use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use tempfile::tempdir;

use tracery::config::FileFormat;
use tracery_cli::{Args, run};

/// Demo sources live at the workspace root, not in the crate
fn demos_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("demos")
}

/// Collects all .puml files from a directory
fn collect_puml_files(dir: PathBuf) -> Vec<PathBuf> {
    let mut files = if let Ok(entries) = fs::read_dir(&dir) {
        entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("puml")
            })
            .collect()
    } else {
        Vec::new()
    };

    // Sort for consistent test output
    files.sort();
    files
}

fn args(input: &Path, output: &Path, format: FileFormat) -> Args {
    Args {
        inputs: vec![input.to_path_buf()],
        output: Some(output.to_path_buf()),
        format: Some(format),
        check_metadata: false,
        config: None,
        log_level: "off".to_string(),
    }
}

#[test]
fn e2e_smoke_test_valid_demos() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let demos = collect_puml_files(demos_dir());
    assert!(!demos.is_empty(), "No demos found in demos/");

    let mut failed = Vec::new();
    for demo in &demos {
        for format in [FileFormat::Svg, FileFormat::Graphml] {
            match run(&args(demo, temp_dir.path(), format)) {
                Ok(images) if images.is_empty() => {
                    failed.push((demo.clone(), "no output".to_string()));
                }
                Ok(images) => {
                    for image in images {
                        let text = fs::read_to_string(image.path()).unwrap();
                        let closing = match format {
                            FileFormat::Svg => "</svg>",
                            FileFormat::Graphml => "</graphml>",
                        };
                        if !text.trim_end().ends_with(closing) {
                            failed.push((demo.clone(), format!("truncated {format}")));
                        }
                    }
                }
                Err(err) => failed.push((demo.clone(), err.to_string())),
            }
        }
    }

    if !failed.is_empty() {
        eprintln!("\nDemos that failed:");
        for (path, err) in &failed {
            eprintln!("  - {}: {}", path.display(), err);
        }
        panic!("{} demo(s) failed unexpectedly", failed.len());
    }
}

#[test]
fn e2e_smoke_test_error_demos() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let error_demos = collect_puml_files(demos_dir().join("errors"));
    assert!(!error_demos.is_empty(), "No error demos found in demos/errors/");

    let unexpectedly_succeeded: Vec<_> = error_demos
        .iter()
        .filter(|demo| run(&args(demo, temp_dir.path(), FileFormat::Svg)).is_ok())
        .collect();

    if !unexpectedly_succeeded.is_empty() {
        eprintln!("\nError demos that unexpectedly succeeded:");
        for path in &unexpectedly_succeeded {
            eprintln!("  - {}", path.display());
        }
        panic!(
            "{} error demo(s) succeeded unexpectedly",
            unexpectedly_succeeded.len()
        );
    }
}

#[test]
fn e2e_multi_block_output_names() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let images = run(&args(
        &demos_dir().join("multi_block.puml"),
        temp_dir.path(),
        FileFormat::Svg,
    ))
    .unwrap();

    let names: Vec<_> = images
        .iter()
        .map(|image| image.path().file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["first.svg", "multi_block_001.svg", "multi_block_002.svg"]);
}

#[test]
fn e2e_check_metadata_keeps_outputs() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let mut args = args(&demos_dir().join("sequence.puml"), temp_dir.path(), FileFormat::Svg);
    args.check_metadata = true;

    // Creation time is not available on every filesystem.
    let timestamps = |path: &Path| {
        let metadata = fs::metadata(path).unwrap();
        (metadata.modified().unwrap(), metadata.created().ok())
    };

    let first = run(&args).unwrap();
    let path = first[0].path().to_path_buf();
    let before = timestamps(&path);

    let second = run(&args).unwrap();
    assert!(second[0].reused());
    assert_eq!(timestamps(&path), before);
}

/// Renders `demo` with the CLI binary under the given locale and timezone.
fn render_with_env(demo: &Path, output: &Path, lang: &str, tz: &str) -> String {
    let status = Command::new(env!("CARGO_BIN_EXE_tracery"))
        .arg(demo)
        .arg("-o")
        .arg(output)
        .args(["--log-level", "off"])
        .env("LANG", lang)
        .env("LC_ALL", lang)
        .env("TZ", tz)
        .status()
        .expect("Failed to run tracery binary");
    assert!(status.success());

    let name = format!("{}.svg", demo.file_stem().unwrap().to_string_lossy());
    fs::read_to_string(output.join(name)).unwrap()
}

#[test]
fn e2e_output_does_not_depend_on_environment() {
    let demo = demos_dir().join("timing.puml");
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();

    let english = render_with_env(&demo, first.path(), "en_US.UTF-8", "UTC");
    let french = render_with_env(&demo, second.path(), "fr_FR.UTF-8", "Asia/Tokyo");
    assert_eq!(english, french);
}
