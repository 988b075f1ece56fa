use std::io::Write;

use amend_cli::{command, init_tracing, run_apply, run_parse, Invocation};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = command().get_matches();
    init_tracing(matches.get_flag("log-json"));

    let mut stdout = std::io::stdout().lock();
    match Invocation::from_matches(&matches)? {
        Invocation::Parse(args) => {
            run_parse(&args, &mut stdout).await?;
        }
        Invocation::Apply(args) => {
            let report = run_apply(&args, &mut stdout).await?;
            if !report.all_succeeded() {
                stdout.flush()?;
                std::process::exit(2);
            }
        }
    }
    Ok(())
}
