use anyhow::{bail, Result};
use luna_core::Credentials;

/// First-run onboarding: ask for the completion-service key and store it in
/// the credentials file. Input is not echoed.
pub fn run_setup() -> Result<Credentials> {
    println!("\nWelcome to Luna");
    println!("Luna answers through OpenRouter and needs an API key.");
    println!("Get one at https://openrouter.ai/keys, or set OPENROUTER_API_KEY.\n");

    let key = rpassword::prompt_password("Enter API key: ")?;
    let creds = Credentials {
        api_key: key.trim().to_string(),
    };
    if !creds.is_configured() {
        bail!("no API key entered");
    }

    creds.save()?;
    println!("Saved to {}\n", Credentials::path().display());
    Ok(creds)
}
