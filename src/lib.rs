pub mod error;
pub mod interact;
pub mod models;
pub mod normalize;
pub mod pocket;
pub mod scan;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use num_format::{Locale, ToFormattedString};
use secrecy::SecretString;

use crate::interact::{Console, Interaction};
use crate::normalize::TrackerMarkers;
use crate::pocket::{Authorizer, PocketClient, ReadingList, RetrieveFilter, SendResponse};
use crate::scan::scan;

pub const FINISHED: &str = "The script has finished running.";

pub const CONFIRM_PROMPT: &str = "Now's the time to review the changes that will be made. \
    If you are happy to send this to the Pocket API, type in 'y' and press Enter: ";

/// Remove Pocket articles that only differ by tracking parameters.
#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Pocket consumer key, asked for interactively when missing
    #[arg(long, env = "POCKET_CONSUMER_KEY", hide_env_values = true)]
    consumer_key: Option<String>,

    /// Page Pocket redirects to after authorization
    #[arg(long, default_value = "https://google.com/")]
    redirect_uri: String,

    /// Cut urls at this marker; repeat to give several, replaces the defaults
    #[arg(
        long = "marker",
        value_name = "MARKER",
        value_parser = clap::builder::NonEmptyStringValueParser::new()
    )]
    markers: Vec<String>,

    /// Write the raw item list reply to this file
    #[arg(long, value_name = "PATH")]
    dump_response: Option<PathBuf>,
}

#[derive(Debug, PartialEq)]
pub enum Outcome {
    Sent(SendResponse),
    /// Holds the answer that was not "y".
    Declined(String),
}

fn consumer_key<I: Interaction>(given: Option<String>, ui: &mut I) -> Result<SecretString> {
    let key = match given {
        Some(key) => key.trim().to_string(),
        None => ui.prompt("Enter your Pocket consumer key: ")?,
    };
    Ok(SecretString::from(key))
}

/// Runs the OAuth handshake; the browser is opened on the authorization
/// page before waiting for Enter.
pub fn authenticate<I: Interaction>(
    authorizer: Authorizer,
    redirect_uri: &str,
    ui: &mut I,
) -> Result<PocketClient> {
    let token = authorizer
        .request_token(redirect_uri)
        .context("Failed to obtain a request token")?;
    let url = pocket::auth_url(&token, redirect_uri)?;

    println!("Opening a browser tab to authenticate with Pocket.");
    println!("{}", url);
    ui.open_browser(url.as_str())?;
    ui.prompt("After you have authenticated in the browser, press Enter...")?;

    authorizer
        .authorize(&token)
        .context("Failed to obtain an access token")
}

/// Fetches everything, queues deletes for duplicates and sends them once
/// the user answers exactly "y".
pub fn dedupe<L, I>(list: &mut L, ui: &mut I, markers: &TrackerMarkers) -> Result<Outcome>
where
    L: ReadingList,
    I: Interaction,
{
    let articles = list
        .retrieve(&RetrieveFilter::default())
        .context("Failed to retrieve saved items")?;
    println!("Found {} articles.", articles.len());

    let report = scan(&articles, markers, list);
    for observation in &report.observations {
        println!("{}", observation);
    }
    println!(
        "{} duplicates queued for deletion, {} articles with trackers kept.",
        report.duplicates().count().to_formatted_string(&Locale::en),
        report.tracked().count().to_formatted_string(&Locale::en),
    );

    let answer = ui.prompt(CONFIRM_PROMPT)?;
    if answer == "y" {
        let response = list.commit().context("Failed to send queued actions")?;
        println!("Request sent. Response: {}", response);
        Ok(Outcome::Sent(response))
    } else {
        println!(
            "Received input '{}'. Modify request has not been sent.",
            answer
        );
        Ok(Outcome::Declined(answer))
    }
}

pub fn run(args: Args) -> Result<()> {
    let mut ui = Console::stdio();
    let markers = if args.markers.is_empty() {
        TrackerMarkers::default()
    } else {
        TrackerMarkers::new(args.markers)
    };
    tracing::debug!(markers = ?markers.as_slice(), "tracker markers");

    let key = consumer_key(args.consumer_key, &mut ui)?;
    let mut client = authenticate(Authorizer::new(key), &args.redirect_uri, &mut ui)?;
    if let Some(path) = args.dump_response {
        client.dump_responses_to(path);
    }

    dedupe(&mut client, &mut ui, &markers)?;
    println!("{}", FINISHED);
    Ok(())
}
