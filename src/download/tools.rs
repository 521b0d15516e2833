//! External programs used to fetch a clip.
//!
//! Each tool is a program plus optional leading arguments, e.g. `yt-dlp` or
//! `python3 -m yt_dlp`. Both can be overridden with `RAINCAM_RESOLVER` and
//! `RAINCAM_CAPTURE`; otherwise they are looked up on `PATH`.

use std::{fmt, str::FromStr, time::Duration};

use tokio::process::Command;

pub const DEFAULT_RESOLVER: &str = "yt-dlp";
pub const DEFAULT_CAPTURE: &str = "ffmpeg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: &str) -> Self {
        ToolCommand {
            program: program.to_string(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl FromStr for ToolCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let program = parts.next().ok_or("empty tool command")?;

        Ok(ToolCommand::new(program).with_args(parts))
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Tools {
    /// Turns a page URL into a directly fetchable manifest.
    pub resolver: ToolCommand,
    /// Records a bounded clip from a manifest.
    pub capture: ToolCommand,
}

impl Default for Tools {
    fn default() -> Self {
        Tools {
            resolver: ToolCommand::new(DEFAULT_RESOLVER),
            capture: ToolCommand::new(DEFAULT_CAPTURE),
        }
    }
}

/// Resolver arguments: print the manifest URL for `url` at `quality`.
pub fn resolver_args<'a>(quality: &'a str, url: &'a str) -> [&'a str; 5] {
    ["--youtube-skip-dash-manifest", "-f", quality, "-g", url]
}

/// Capture arguments: copy `length` of an HLS stream, without audio, into `output`.
pub fn capture_args(manifest: &str, length: Duration, output: &str) -> Vec<String> {
    vec![
        "-f".to_string(),
        "hls".to_string(),
        "-i".to_string(),
        manifest.to_string(),
        "-t".to_string(),
        clip_length(length),
        "-c".to_string(),
        "copy".to_string(),
        "-an".to_string(),
        output.to_string(),
    ]
}

/// `HH:MM:SS`, as accepted by ffmpeg's `-t`.
pub fn clip_length(length: Duration) -> String {
    let secs = length.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_parse_program_with_leading_args() {
        let tool: ToolCommand = "python3 -m yt_dlp".parse().unwrap();

        assert_eq!(tool, ToolCommand::new("python3").with_args(["-m", "yt_dlp"]));
        assert_eq!(tool.to_string(), "python3 -m yt_dlp");
    }

    #[test]
    fn should_reject_empty_tool() {
        assert!("   ".parse::<ToolCommand>().is_err());
    }

    #[test]
    fn should_format_clip_length() {
        assert_eq!(clip_length(Duration::from_secs(120)), "00:02:00");
        assert_eq!(clip_length(Duration::from_secs(10)), "00:00:10");
        assert_eq!(clip_length(Duration::from_secs(3725)), "01:02:05");
    }

    #[test]
    fn should_build_capture_args() {
        let args = capture_args("https://m/x.m3u8", Duration::from_secs(120), "/tmp/Pier.mp4");

        assert_eq!(
            args.join(" "),
            "-f hls -i https://m/x.m3u8 -t 00:02:00 -c copy -an /tmp/Pier.mp4"
        );
    }
}
