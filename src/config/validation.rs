use super::defaults::{
    MAX_AUDIO_AMPLIFY, MAX_CALL_SETUP_SECS, MAX_DELAY_SECS, MAX_DURATION_INFLUENCE,
    MIN_AUDIO_AMPLIFY, MIN_CALL_SETUP_SECS, MIN_DURATION_INFLUENCE,
};
use super::AppConfig;
use crate::contact::Contact;
use crate::settings::Settings;
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::{fs, path::Path};

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values and normalize paths.
    pub fn validate(&mut self) -> Result<()> {
        if let Some(amplify) = self.audio_amplify {
            if !(MIN_AUDIO_AMPLIFY..=MAX_AUDIO_AMPLIFY).contains(&amplify) {
                bail!(
                    "--audio-amplify must be between {MIN_AUDIO_AMPLIFY} and {MAX_AUDIO_AMPLIFY}, got {amplify}"
                );
            }
        }
        if let Some(influence) = self.duration_influence {
            if !(MIN_DURATION_INFLUENCE..=MAX_DURATION_INFLUENCE).contains(&influence) {
                bail!(
                    "--duration-influence must be between {MIN_DURATION_INFLUENCE} and {MAX_DURATION_INFLUENCE}, got {influence}"
                );
            }
        }
        if let Some(secs) = self.call_setup_secs {
            if !(MIN_CALL_SETUP_SECS..=MAX_CALL_SETUP_SECS).contains(&secs) {
                bail!(
                    "--call-setup-secs must be between {MIN_CALL_SETUP_SECS} and {MAX_CALL_SETUP_SECS}, got {secs}"
                );
            }
        }
        if let Some(secs) = self.activation_delay_secs {
            if secs > MAX_DELAY_SECS {
                bail!("--activation-delay-secs must be at most {MAX_DELAY_SECS}, got {secs}");
            }
        }
        if let Some(secs) = self.recall_delay_secs {
            if secs > MAX_DELAY_SECS {
                bail!("--recall-delay-secs must be at most {MAX_DELAY_SECS}, got {secs}");
            }
        }

        if let Some(number) = &self.contact_number {
            let probe = Contact::new("", number.clone());
            if !probe.has_valid_number() {
                bail!(
                    "--contact-number '{number}' is not a valid phone number \
                     (digits plus '+ * # space - ( )' only)"
                );
            }
        }

        if let Some(script) = &mut self.notify_script {
            let canonical = sanitize_script(script).context("--notify-script is not usable")?;
            *script = canonical;
        }

        Ok(())
    }

    /// Overlay the CLI overrides onto the persisted settings.
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(number) = &self.contact_number {
            settings.contact_number = number.clone();
        }
        if let Some(name) = &self.contact_name {
            settings.contact_name = name.clone();
        }
        if let Some(script) = &self.notify_script {
            settings.notify_script = Some(script.clone());
        }
        if let Some(amplify) = self.audio_amplify {
            settings.audio_amplify = amplify;
        }
        if let Some(influence) = self.duration_influence {
            settings.duration_influence = influence;
        }
        if let Some(secs) = self.call_setup_secs {
            settings.call_setup_secs = secs;
        }
        if let Some(secs) = self.activation_delay_secs {
            settings.activation_delay_secs = secs;
        }
        if let Some(secs) = self.recall_delay_secs {
            settings.recall_delay_secs = secs;
        }
        if self.send_sms {
            settings.send_sms = true;
        }
    }
}

/// Require an existing, executable script file and return its canonical path.
fn sanitize_script(path: &Path) -> Result<std::path::PathBuf> {
    let canonical = path
        .canonicalize()
        .with_context(|| format!("failed to canonicalize script path '{}'", path.display()))?;
    let metadata = fs::metadata(&canonical)
        .with_context(|| format!("failed to inspect script '{}'", canonical.display()))?;
    if !metadata.is_file() {
        bail!("script '{}' is not a file", canonical.display());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = metadata.permissions().mode();
        if mode & 0o111 == 0 {
            return Err(anyhow!(
                "script '{}' exists but is not executable (mode {:o})",
                canonical.display(),
                mode
            ));
        }
    }
    Ok(canonical)
}
