//! Desktop notification and sound backend.
//!
//! Shells out to whatever the platform ships with:
//!
//! | Platform | Notification | Sound |
//! |----------|--------------|-------|
//! | macOS    | `osascript -e 'display notification …'` | `afplay` |
//! | Linux    | `notify-send` | `paplay`, then `aplay` |
//! | Windows  | PowerShell toast | PowerShell `Media.SoundPlayer` |

use super::{Notifier, NotifyError};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Operating system family used to pick notification commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOS,
    Linux,
    Windows,
    Unsupported,
}

impl Platform {
    pub fn detect() -> Self {
        match std::env::consts::OS {
            "macos" => Platform::MacOS,
            "linux" | "freebsd" | "openbsd" | "netbsd" => Platform::Linux,
            "windows" => Platform::Windows,
            _ => Platform::Unsupported,
        }
    }
}

/// A fully-resolved external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: &'static str,
    pub args: Vec<String>,
}

impl CommandSpec {
    fn new(program: &'static str, args: Vec<String>) -> Self {
        Self { program, args }
    }
}

/// [`Notifier`] backed by the platform's native notification tooling.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    platform: Platform,
}

impl DesktopNotifier {
    pub fn new() -> Self {
        Self::for_platform(Platform::detect())
    }

    pub fn for_platform(platform: Platform) -> Self {
        Self { platform }
    }

    /// Command that shows a notification, or `None` when unsupported.
    pub fn notification_command(&self, title: &str, message: &str) -> Option<CommandSpec> {
        match self.platform {
            Platform::MacOS => {
                let script = format!(
                    "display notification \"{}\" with title \"{}\"",
                    escape_applescript(message),
                    escape_applescript(title)
                );
                Some(CommandSpec::new("osascript", vec!["-e".to_string(), script]))
            }
            Platform::Linux => Some(CommandSpec::new(
                "notify-send",
                vec![title.to_string(), message.to_string()],
            )),
            Platform::Windows => {
                let script = format!(
                    "[Windows.UI.Notifications.ToastNotificationManager, Windows.UI.Notifications, ContentType = WindowsRuntime] > $null; \
                     $t = [Windows.UI.Notifications.ToastNotificationManager]::GetTemplateContent([Windows.UI.Notifications.ToastTemplateType]::ToastText02); \
                     $x = $t.GetElementsByTagName('text'); \
                     $x.Item(0).AppendChild($t.CreateTextNode('{}')) > $null; \
                     $x.Item(1).AppendChild($t.CreateTextNode('{}')) > $null; \
                     [Windows.UI.Notifications.ToastNotificationManager]::CreateToastNotifier('session-idle').Show([Windows.UI.Notifications.ToastNotification]::new($t))",
                    escape_powershell(title),
                    escape_powershell(message)
                );
                Some(powershell(script))
            }
            Platform::Unsupported => None,
        }
    }

    /// Commands to try, in order, for playing `path`.
    pub fn sound_commands(&self, path: &Path) -> Vec<CommandSpec> {
        let file = path.display().to_string();
        match self.platform {
            Platform::MacOS => vec![CommandSpec::new("afplay", vec![file])],
            Platform::Linux => vec![
                CommandSpec::new("paplay", vec![file.clone()]),
                CommandSpec::new("aplay", vec![file]),
            ],
            Platform::Windows => vec![powershell(format!(
                "(New-Object Media.SoundPlayer '{}').PlaySync()",
                escape_powershell(&file)
            ))],
            Platform::Unsupported => Vec::new(),
        }
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn send_notification(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let spec = self
            .notification_command(title, message)
            .ok_or(NotifyError::Unsupported)?;
        run(&spec).await
    }

    async fn play_sound(&self, path: &Path) -> Result<(), NotifyError> {
        if !path.exists() {
            return Err(NotifyError::MissingSound(path.to_path_buf()));
        }
        let mut last_err = NotifyError::Unsupported;
        for spec in self.sound_commands(path) {
            match run(&spec).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    debug!("Sound player {} failed: {e}", spec.program);
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }
}

async fn run(spec: &CommandSpec) -> Result<(), NotifyError> {
    let output = Command::new(spec.program)
        .args(&spec.args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| NotifyError::Spawn {
            program: spec.program,
            source,
        })?;

    if !output.status.success() {
        return Err(NotifyError::CommandFailed {
            program: spec.program,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

fn powershell(script: String) -> CommandSpec {
    CommandSpec::new(
        "powershell",
        vec!["-NoProfile".to_string(), "-Command".to_string(), script],
    )
}

fn escape_applescript(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn escape_powershell(s: &str) -> String {
    s.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_macos_notification_escapes_quotes() {
        let n = DesktopNotifier::for_platform(Platform::MacOS);
        let spec = n.notification_command("Say \"hi\"", "done\\ok").unwrap();
        assert_eq!(spec.program, "osascript");
        assert_eq!(spec.args[0], "-e");
        assert_eq!(
            spec.args[1],
            r#"display notification "done\\ok" with title "Say \"hi\"""#
        );
    }

    #[test]
    fn test_linux_notification_passes_raw_args() {
        let n = DesktopNotifier::for_platform(Platform::Linux);
        let spec = n.notification_command("Title", "it's idle").unwrap();
        assert_eq!(spec.program, "notify-send");
        assert_eq!(spec.args, vec!["Title".to_string(), "it's idle".to_string()]);
    }

    #[test]
    fn test_windows_notification_escapes_single_quotes() {
        let n = DesktopNotifier::for_platform(Platform::Windows);
        let spec = n.notification_command("T", "it's idle").unwrap();
        assert_eq!(spec.program, "powershell");
        assert!(spec.args[2].contains("it''s idle"));
    }

    #[test]
    fn test_linux_sound_falls_back_to_aplay() {
        let n = DesktopNotifier::for_platform(Platform::Linux);
        let programs: Vec<_> = n
            .sound_commands(&PathBuf::from("/tmp/ding.oga"))
            .into_iter()
            .map(|s| s.program)
            .collect();
        assert_eq!(programs, vec!["paplay", "aplay"]);
    }

    #[test]
    fn test_unsupported_platform_has_no_commands() {
        let n = DesktopNotifier::for_platform(Platform::Unsupported);
        assert!(n.notification_command("t", "m").is_none());
        assert!(n.sound_commands(Path::new("/x")).is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_platform_reports_error() {
        let n = DesktopNotifier::for_platform(Platform::Unsupported);
        let err = n.send_notification("t", "m").await.unwrap_err();
        assert!(matches!(err, NotifyError::Unsupported));
    }

    #[tokio::test]
    async fn test_missing_sound_file_is_rejected_before_spawning() {
        let n = DesktopNotifier::for_platform(Platform::Linux);
        let err = n
            .play_sound(Path::new("/nonexistent/session-idle/ding.oga"))
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::MissingSound(_)));
    }
}
