use std::ffi::OsString;
use std::path::PathBuf;
use pico_args::Arguments;
use stream_cache::CacheConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub filename: Vec<PathBuf>,
    pub cache: CacheConfig,
    pub chunk: usize,
    pub verify_back: Option<usize>,
}


const HELP: &str = "\
cachecat

USAGE:
  cachecat [OPTIONS] [INPUT ...]

FLAGS:
  -h, --help               Prints help information

OPTIONS:
  -c, --capacity BYTES     Size of each cache buffer [default: 5242880]
      --chunk BYTES        Bytes copied to stdout per read [default: 65536]
      --verify-back BYTES  After each chunk, seek back up to BYTES, read them again and
                           fail if they differ

ARGS:
  <INPUT>                  Input file(s) to read; gzip files are decompressed. Reads stdin if none.
";

impl Default for Config {
    fn default() -> Self {
        Config {
            filename: Vec::new(),
            cache: CacheConfig::default(),
            chunk: 64 * 1024,
            verify_back: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Config, pico_args::Error> {
        let pargs = pico_args::Arguments::from_env();
        Self::from_args(pargs)
    }

    pub fn from_vec(args: Vec<OsString>) -> Result<Config, pico_args::Error> {
        Self::from_args(Arguments::from_vec(args))
    }

    fn from_args(mut pargs: Arguments) -> Result<Config, pico_args::Error> {
        if pargs.contains(["-h", "--help"]) {
            print!("{}", HELP);
            std::process::exit(0);
        }

        let mut cfg = Config::default();
        cfg.parse_args(pargs)?;
        Ok(cfg)
    }

    fn parse_args(&mut self, mut pargs: Arguments) -> Result<(), pico_args::Error> {
        if let Some(capacity) = pargs.opt_value_from_fn(["-c", "--capacity"], parse_size)? {
            self.cache.capacity = capacity;
        }
        if let Some(chunk) = pargs.opt_value_from_fn("--chunk", parse_size)? {
            self.chunk = chunk;
        }
        self.verify_back = pargs.opt_value_from_str("--verify-back")?;

        // Parse remaining args as input filenames
        for ostr in pargs.finish() {
            if let Some(s) = ostr.to_str() {
                if s.as_bytes().first() == Some(&b'-') {
                    return Err(pico_args::Error::ArgumentParsingFailed {
                        cause: format!("unknown argument: {s}"),
                    });
                }
            }
            self.filename.push(PathBuf::from(ostr));
        }
        Ok(())
    }
}

// A byte count that must not be zero
fn parse_size(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("size must be greater than zero".to_string()),
        Ok(n) => Ok(n),
        Err(err) => Err(format!("{s:?}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::from_vec(args(&["a.log", "b.gz"])).unwrap();
        assert_eq!(cfg.filename, vec![PathBuf::from("a.log"), PathBuf::from("b.gz")]);
        assert_eq!(cfg.cache, CacheConfig::default());
        assert_eq!(cfg.chunk, 64 * 1024);
        assert_eq!(cfg.verify_back, None);
    }

    #[test]
    fn test_options() {
        let cfg = Config::from_vec(args(&["-c", "4096", "--chunk", "100", "--verify-back", "32"])).unwrap();
        assert!(cfg.filename.is_empty());
        assert_eq!(cfg.cache.capacity, 4096);
        assert_eq!(cfg.chunk, 100);
        assert_eq!(cfg.verify_back, Some(32));
    }

    #[test]
    fn test_bad_arguments() {
        assert!(Config::from_vec(args(&["--capacity", "0"])).is_err());
        assert!(Config::from_vec(args(&["--chunk", "lots"])).is_err());
        assert!(Config::from_vec(args(&["--bogus"])).is_err());
    }
}
