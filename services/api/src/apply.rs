use clap::Args;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use url::Url;
use vault_intake::config::ClientConfig;
use vault_intake::error::AppError;
use vault_intake::form::{FormClient, FormError, FormState, RelayClient};
use vault_intake::schema::{ApplicationDraft, ApplicationField};

#[derive(Args, Debug, Default)]
pub(crate) struct ApplyArgs {
    /// JSON file with field values; anything it leaves blank is prompted for
    #[arg(long)]
    pub(crate) payload: Option<PathBuf>,
    /// Relay base URL (defaults to RELAY_BASE, then http://localhost:3001)
    #[arg(long)]
    pub(crate) relay_url: Option<Url>,
}

pub(crate) async fn run_apply(args: ApplyArgs) -> Result<(), AppError> {
    let mut config = ClientConfig::load()?;
    if let Some(relay_url) = args.relay_url {
        config.relay_base = relay_url;
    }
    let client = FormClient::new(RelayClient::new(&config)?);

    let mut form = FormState::new();
    if let Some(path) = args.payload {
        let raw = std::fs::read_to_string(path)?;
        let draft = ApplicationDraft::from_json(&serde_json::from_str(&raw)?);
        for field in ApplicationField::ALL {
            form.input(field, draft.get(field));
        }
    }

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    println!("VAULT credit application");
    let blank: Vec<_> = ApplicationField::ALL
        .into_iter()
        .filter(|field| form.value(*field).is_empty())
        .collect();
    prompt_fields(&mut form, &blank, &mut input, &mut output)?;

    loop {
        println!("[{}]", client.button_label());
        match client.submit(&mut form).await {
            Ok(modal) => {
                println!("{modal}");
                return Ok(());
            }
            Err(FormError::Invalid(errors)) => {
                let invalid: Vec<_> = ApplicationField::ALL
                    .into_iter()
                    .filter(|field| errors.message_for(*field).is_some())
                    .collect();
                prompt_fields(&mut form, &invalid, &mut input, &mut output)?;
            }
            Err(FormError::Busy) => {
                println!("A submission is already in flight.");
                return Ok(());
            }
        }
    }
}

/// Prompt for each field in turn, showing the last validation message when
/// there is one. The country field is fixed and never prompted.
fn prompt_fields<R: BufRead, W: Write>(
    form: &mut FormState,
    fields: &[ApplicationField],
    input: &mut R,
    output: &mut W,
) -> Result<(), AppError> {
    for field in fields {
        if *field == ApplicationField::AddressCountryCode {
            continue;
        }
        if let Some(message) = form.field_error(*field) {
            writeln!(output, "  ! {message}")?;
        }
        write!(output, "{}: ", field.label())?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed").into());
        }
        form.input(*field, line.trim_end_matches(['\r', '\n']));
    }
    Ok(())
}
