use std::fs::File;
use std::io::BufReader;

use codec_csv::CsvReader;
use flow_engine::RunSummary;

use crate::config::{Cli, Effective};
use crate::error::CliError;

/// Resolve the effective settings from `cli` and run them.
pub fn execute(cli: &Cli) -> Result<RunSummary, CliError> {
    run(&Effective::new(cli)?)
}

/// Open the input, make sure the output directory exists, aggregate.
pub fn run(args: &Effective) -> Result<RunSummary, CliError> {
    let input = File::open(&args.input).map_err(|e| CliError::Io {
        context: format!("open {}", args.input.display()),
        source: e,
    })?;

    std::fs::create_dir_all(&args.output).map_err(|e| CliError::Io {
        context: format!("mkdir {}", args.output.display()),
        source: e,
    })?;

    tracing::info!(input = %args.input.display(), "reading flows");
    let reader = CsvReader::with_options(BufReader::new(input), args.csv);
    let summary = flow_engine::run(&args.engine_config(), reader)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;
    use codec_csv::CsvOptions;
    use flow_engine::{CommitScope, Mode};

    use super::*;

    const INPUT: &str = "Destination.IP,Timestamp,Total.Fwd.Packets,Total.Backward.Packets,\
Total.Length.of.Fwd.Packets,Total.Length.of.Bwd.Packets,ProtocolName
172.19.1.46,26/04/201711:11:17,22,55,132,110414,HTTP_PROXY
172.19.1.46,26/04/201712:01:00,1,1,1,1,HTTP_PROXY
172.19.1.46,26/04/201711:59:59,1,2,3,4,HTTP_PROXY
";

    fn effective(input: PathBuf, output: PathBuf, mode: Mode) -> Effective {
        Effective {
            input,
            output,
            mode,
            commit_scope: CommitScope::All,
            csv: CsvOptions::default(),
        }
    }

    #[test]
    fn creates_output_dir_and_writes_hours() {
        for mode in [Mode::Full, Mode::Streaming] {
            let dir = tempfile::tempdir().unwrap();
            let input = dir.path().join("flows.csv");
            std::fs::write(&input, INPUT).unwrap();
            let output = dir.path().join("nested").join("out");

            let summary = run(&effective(input, output.clone(), mode)).unwrap();
            assert_eq!(summary.records, 3);
            assert_eq!(summary.buckets, 2);

            assert_eq!(
                std::fs::read_to_string(output.join("2017-04-26-11.csv")).unwrap(),
                "Timestamp,Destination.IP,ProtocolName,Packets,Bytes\n\
2017-04-26-11,172.19.1.46,HTTP_PROXY,80,110553\n"
            );
            assert!(output.join("2017-04-26-12.csv").is_file());
        }
    }

    #[test]
    fn missing_input_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(&effective(dir.path().join("absent.csv"), dir.path().into(), Mode::Full))
            .unwrap_err();
        assert!(matches!(err, CliError::Io { .. }));
        assert!(err.to_string().starts_with("open "));
    }

    #[test]
    fn config_and_run_failures_share_one_result() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("absent.toml");
        let input = dir.path().join("flows.csv");
        std::fs::write(&input, INPUT).unwrap();

        let parse = |extra: &[&str]| {
            let mut args = vec!["flowagg".to_string(), "--config".into()];
            args.push(config.display().to_string());
            args.extend(extra.iter().map(|a| a.to_string()));
            Cli::try_parse_from(args).unwrap()
        };

        let err = execute(&parse(&["-i", input.to_str().unwrap(), "--commit-scope", "bogus"]))
            .unwrap_err();
        assert!(matches!(err, CliError::Config { .. }), "{err}");

        let absent = dir.path().join("absent.csv");
        let err = execute(&parse(&["-i", absent.to_str().unwrap()])).unwrap_err();
        assert!(matches!(err, CliError::Io { .. }), "{err}");

        let out = dir.path().join("out");
        let summary = execute(&parse(&[
            "-i",
            input.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
        ]))
        .unwrap();
        assert_eq!(summary.records, 3);
    }
}
