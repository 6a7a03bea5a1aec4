//! Interactive form filled in on the terminal.

use std::io::{self, BufRead, Write};

use tokenkeep_core::{FormReader, FormValues};
use tracing::warn;

/// Form whose controls are prompted for when first read. Values given on
/// the command line are used as is; defaults are offered in brackets.
pub struct PromptForm {
    given: FormValues,
    defaults: FormValues,
}

impl PromptForm {
    pub fn new(given: FormValues) -> Self {
        Self {
            given,
            defaults: FormValues::new(),
        }
    }

    pub fn with_default(mut self, name: &str, value: Option<&str>) -> Self {
        if let Some(value) = value {
            self.defaults.set(name, value);
        }
        self
    }

    fn ask(&self, name: &str) -> io::Result<String> {
        let label = label(name);
        if is_secret(name) {
            return rpassword::prompt_password(format!("{}: ", label));
        }

        let default = self.defaults.field(name);
        let mut stdout = io::stdout().lock();
        match default {
            Some(ref value) => write!(stdout, "{} [{}]: ", label, value)?,
            None => write!(stdout, "{}: ", label)?,
        }
        stdout.flush()?;

        let mut input = String::new();
        io::stdin().lock().read_line(&mut input)?;
        let input = input.trim_end_matches(['\r', '\n']);

        Ok(match default {
            Some(value) if input.trim().is_empty() => value,
            _ => input.to_string(),
        })
    }
}

impl FormReader for PromptForm {
    fn field(&self, name: &str) -> Option<String> {
        if let Some(value) = self.given.field(name) {
            return Some(value);
        }
        match self.ask(name) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, field = name, "Failed to read input");
                None
            }
        }
    }

    fn checked(&self, name: &str) -> bool {
        if self.given.contains(name) {
            return self.given.checked(name);
        }
        match self.ask(name) {
            Ok(answer) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            Err(e) => {
                warn!(error = %e, field = name, "Failed to read input");
                false
            }
        }
    }
}

fn is_secret(name: &str) -> bool {
    matches!(name, "password" | "confirmPassword")
}

fn label(name: &str) -> &str {
    match name {
        "email" => "Email",
        "password" => "Password",
        "confirmPassword" => "Confirm password",
        "rememberMe" => "Remember me? [y/N]",
        "username" => "Username",
        "firstname" => "First name",
        "date" => "Birth date (YYYY-MM-DD, optional)",
        "phonenumber" => "Phone number",
        "streetnumber" => "Street number (optional)",
        "address" => "Address",
        "postalcode" => "Postal code",
        "city" => "City",
        "country" => "Country (optional)",
        other => other,
    }
}
