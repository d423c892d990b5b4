//! Output path resolution

use std::path::{Path, PathBuf};

use crate::domain::model::OutputFormat;
use crate::error::{CutXError, CutXResult};

/// Suffix appended to the source stem
pub const OUTPUT_SUFFIX: &str = "_cut";

/// `<stem>_cut.<ext>` next to `source`, or inside `output_dir` when given
pub fn cut_output_path(
    source: &Path,
    format: OutputFormat,
    output_dir: Option<&Path>,
) -> CutXResult<PathBuf> {
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| {
            CutXError::validation(format!("source path '{}' has no file name", source.display()))
        })?;

    let file_name = format!("{}{}.{}", stem, OUTPUT_SUFFIX, format.extension());
    let dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => source.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    Ok(dir.join(file_name))
}

/// Absolute form of `path`, resolved against the working directory
pub fn absolutize(path: &Path) -> CutXResult<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// `file:` URL form understood by ffmpeg; keeps names with colons literal
pub fn ffmpeg_file_arg(path: &Path) -> String {
    format!("file:{}", path.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_next_to_source() {
        let out = cut_output_path(Path::new("/media/talk.mov"), OutputFormat::Mp4, None).unwrap();
        assert_eq!(out, PathBuf::from("/media/talk_cut.mp4"));

        let audio = cut_output_path(Path::new("/media/talk.mov"), OutputFormat::Mp3, None).unwrap();
        assert_eq!(audio, PathBuf::from("/media/talk_cut.mp3"));
    }

    #[test]
    fn test_output_in_configured_dir() {
        let out = cut_output_path(
            Path::new("/media/ep.01.mp4"),
            OutputFormat::Mp4,
            Some(Path::new("/exports")),
        )
        .unwrap();
        assert_eq!(out, PathBuf::from("/exports/ep.01_cut.mp4"));
    }

    #[test]
    fn test_relative_source_stays_relative() {
        let out = cut_output_path(Path::new("clip.mp4"), OutputFormat::Mp4, None).unwrap();
        assert_eq!(out, PathBuf::from("clip_cut.mp4"));
    }

    #[test]
    fn test_rejects_path_without_name() {
        assert!(cut_output_path(Path::new("/"), OutputFormat::Mp4, None).is_err());
    }

    #[test]
    fn test_ffmpeg_file_arg() {
        assert_eq!(ffmpeg_file_arg(Path::new("/a/b:c.mp4")), "file:/a/b:c.mp4");
    }

    #[test]
    fn test_absolutize() {
        let abs = absolutize(Path::new("x.mp4")).unwrap();
        assert!(abs.is_absolute());
        assert!(abs.ends_with("x.mp4"));
    }
}
