use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

pub fn level_for(verbose: bool, debug: bool) -> LevelFilter {
    if debug {
        LevelFilter::Debug
    } else if verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    }
}

/// Logs go to stderr; stdout belongs to the wizard screens.
pub fn init(verbose: bool, debug: bool) {
    let config = ConfigBuilder::new()
        .add_filter_allow_str("life_coach")
        .build();
    let _ = TermLogger::init(
        level_for(verbose, debug),
        config,
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels() {
        assert_eq!(level_for(false, false), LevelFilter::Warn);
        assert_eq!(level_for(true, false), LevelFilter::Info);
        assert_eq!(level_for(true, true), LevelFilter::Debug);
    }
}
