use healthcheck_core::Interaction;

use crate::output::{self, ColorMode};

/// Confirmations through `dialoguer`, notices on stderr.
///
/// With `assume_yes` every confirmation is accepted without prompting. When
/// stdin is not a terminal the prompt fails and counts as "no".
pub struct TerminalUi {
    color: ColorMode,
    assume_yes: bool,
}

impl TerminalUi {
    pub fn new(color: ColorMode, assume_yes: bool) -> Self {
        Self { color, assume_yes }
    }
}

impl Interaction for TerminalUi {
    fn confirm(&mut self, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        match dialoguer::Confirm::new()
            .with_prompt(message)
            .default(false)
            .interact()
        {
            Ok(answer) => answer,
            Err(e) => {
                tracing::debug!(error = %e, "confirmation prompt unavailable, treating as no");
                false
            }
        }
    }

    fn notify(&mut self, message: &str) {
        if let Err(e) = output::print_notice(&mut std::io::stderr(), message, self.color) {
            tracing::warn!(error = %e, "failed to print notice");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assume_yes_skips_prompt() {
        let mut ui = TerminalUi::new(ColorMode(false), true);
        assert!(ui.confirm("¿Continuar?"));
    }
}
