use std::future::Future;
use std::io::{self, IsTerminal, Read, Write};

use tokio::signal;

use crate::{
    color::{MaybePaint, STATUS_TEXT},
    config::Config,
    debug, die,
    registry::populate,
    translator::{self, input_description, FinishReason, TranslationRequest},
    utils::errors::report,
    warn, TranslateArgs,
};

fn read_stdin() -> String {
    let mut text = String::new();

    if let Err(err) = io::stdin().read_to_string(&mut text) {
        die!("failed to read standard input: {}", err);
    }

    // A trailing newline from the terminal or a pipe is not part of the text
    let trimmed = text.trim_end_matches(['\n', '\r']).len();
    text.truncate(trimmed);

    text
}

fn finish_warning(reason: Option<FinishReason>) -> Option<&'static str> {
    match reason? {
        FinishReason::Length => Some("translation was truncated at the model's length limit"),
        FinishReason::ContentFilter => Some("translation was cut short by a content filter"),
        FinishReason::Stop => None,
    }
}

/// Completes when `signal` fires. A signal that cannot be listened for never
/// cancels.
async fn cancel_on<F: Future<Output = io::Result<()>>>(signal: F) {
    if let Err(err) = signal.await {
        debug!("failed to listen for ctrl-c: {}", err);
        std::future::pending::<()>().await;
    }
}

pub(crate) async fn translate_cmd(config: &Config, args: &TranslateArgs) {
    let text = match &args.text {
        Some(text) => text.clone(),
        None => read_stdin(),
    };

    let language = args
        .language
        .as_deref()
        .unwrap_or_else(|| populate::language(config));

    let model = args
        .model
        .as_deref()
        .unwrap_or_else(|| populate::model(config));

    let interactive = io::stderr().is_terminal();

    if interactive {
        let description = input_description(text.chars().count());

        if !description.is_empty() {
            eprintln!("{}", STATUS_TEXT.maybe_paint(description));
        }
    }

    let request = match TranslationRequest::new(&text, language) {
        Ok(request) => request,
        Err(err) => die!("{}", report(&err)),
    };

    let client = populate::chat_client(config);

    let mut stdout = io::stdout();

    let result = translator::translate(
        &client,
        model,
        &request,
        |fragment| {
            print!("{}", fragment);
            let _ = stdout.flush();
        },
        cancel_on(signal::ctrl_c()),
    )
    .await;

    let translation = match result {
        Ok(translation) => translation,
        Err(err) => {
            println!();
            die!("translation to {} failed: {}", request.language(), report(&err))
        }
    };

    if !translation.text.ends_with('\n') {
        println!();
    }

    if translation.cancelled {
        warn!("translation cancelled");
    } else if let Some(warning) = finish_warning(translation.finish_reason) {
        warn!("{}", warning);
    }
}
