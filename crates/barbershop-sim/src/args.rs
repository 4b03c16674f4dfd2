use std::path::PathBuf;

use barbershop::Delay;

/// Command-line overrides. `None` keeps the config file (or default) value.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Args {
    pub config: Option<PathBuf>,
    pub seats: Option<usize>,
    pub clients: Option<usize>,
    pub names: Option<Vec<String>>,
    pub service: Option<Delay>,
    pub arrival: Option<Delay>,
    pub seed: Option<u64>,
    pub json: bool,
}

pub const USAGE: &str = "\
Usage: barbershop-sim [options]

Options:
  --config <path>          JSON config file
  --seats <n>              Waiting-area capacity [default: 3]
  --clients <n>            Number of clients, named client-1..n
  --names <a,b,c>          Client names, in arrival order
  --service-ms <ms|a..b>   Service duration [default: 5000]
  --arrival-ms <ms|a..b>   Gap before each arrival [default: 1000..2500]
  --seed <n>               RNG seed for reproducible runs
  --json                   Print the full report as JSON

Environment:
  BARBERSHOP_LOG           debug|info|warn|error [default: info]
  LOG_FORMAT=json          Structured JSON logs on stderr";

pub fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args::default();

    let mut i = 1; // skip argv[0]
    while i < args.len() {
        let flag = args[i].as_str();

        match flag {
            "--config" => parsed.config = Some(PathBuf::from(take_value(args, &mut i)?)),
            "--seats" => parsed.seats = Some(parse_number(flag, take_value(args, &mut i)?)?),
            "--clients" => parsed.clients = Some(parse_number(flag, take_value(args, &mut i)?)?),
            "--names" => {
                let names = take_value(args, &mut i)?;
                parsed.names = Some(names.split(',').map(|s| s.trim().to_string()).collect());
            }
            "--service-ms" => parsed.service = Some(parse_delay(flag, take_value(args, &mut i)?)?),
            "--arrival-ms" => parsed.arrival = Some(parse_delay(flag, take_value(args, &mut i)?)?),
            "--seed" => parsed.seed = Some(parse_number(flag, take_value(args, &mut i)?)?),
            "--json" => parsed.json = true,
            "--help" | "-h" => return Err(String::new()),
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    if parsed.clients.is_some() && parsed.names.is_some() {
        return Err("--clients and --names are mutually exclusive".to_string());
    }

    Ok(parsed)
}

/// Advance past `args[*i]` and return the value that follows it.
fn take_value<'a>(args: &'a [String], i: &mut usize) -> Result<&'a str, String> {
    let flag = &args[*i];
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("{flag} expects a non-negative integer, got '{value}'"))
}

fn parse_delay(flag: &str, value: &str) -> Result<Delay, String> {
    Delay::parse(value).ok_or_else(|| format!("{flag} expects <ms> or <min>..<max>, got '{value}'"))
}
