use jsfunc::{extract::function_names, JsFunction, Value};
use nu_ansi_term::{Color, Style};
use reedline::{DefaultPrompt, DefaultPromptSegment, Highlighter, Reedline, Signal, StyledText};

fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(path) = args.first() else {
        eprintln!("usage: jsfunc <script-file> [function [args...]]");
        std::process::exit(2);
    };
    let script = match std::fs::read_to_string(path) {
        Ok(script) => script,
        Err(err) => {
            eprintln!("Error: cannot read {path}: {err}");
            std::process::exit(1);
        }
    };

    // Single evaluation when a function name is given on the command line
    if let Some(name) = args.get(1) {
        let call_args = args[2..].iter().map(|arg| parse_host_value(arg)).collect();
        match evaluate(&script, name, call_args) {
            Ok(value) => println!("{value}"),
            Err(err) => {
                eprintln!("Error: {err}");
                std::process::exit(1);
            }
        }
        return;
    }

    run_repl(&script);
}

/// Installs a subscriber only when `RUST_LOG` is set, e.g. `RUST_LOG=jsfunc=trace`.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn evaluate(script: &str, name: &str, args: Vec<Value>) -> Result<Value, jsfunc::JsError> {
    JsFunction::new(script, name)?.eval(args)
}

/// `-12` and `7` become integers, `[a,b]` an array, `"x"` or anything else text.
fn parse_host_value(text: &str) -> Value {
    let text = text.trim();
    if let Some(inner) = text.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
        if inner.trim().is_empty() {
            return Value::array(Vec::new());
        }
        return Value::array(split_top_level(inner).into_iter().map(parse_host_value).collect());
    }
    if let Ok(value) = text.parse::<i64>() {
        return Value::integer(value);
    }
    for quote in ['"', '\''] {
        if let Some(inner) = text.strip_prefix(quote).and_then(|rest| rest.strip_suffix(quote)) {
            return Value::text(inner);
        }
    }
    Value::text(text)
}

/// Splits on commas that are not nested inside brackets.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, ch) in text.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&text[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// `name(arg, ...)` typed at the prompt.
fn parse_call(line: &str) -> Option<(&str, Vec<Value>)> {
    let open = line.find('(')?;
    let inner = line[open + 1..].strip_suffix(')')?;
    let name = line[..open].trim();
    if name.is_empty() {
        return None;
    }
    let args = if inner.trim().is_empty() {
        Vec::new()
    } else {
        split_top_level(inner).into_iter().map(parse_host_value).collect()
    };
    Some((name, args))
}

struct CallHighlighter;

impl Highlighter for CallHighlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        let mut styled = StyledText::new();
        if line.trim_start().starts_with(':') {
            styled.push((Style::new().fg(Color::Magenta).bold(), line.to_string()));
            return styled;
        }

        let name_end = line.find('(').unwrap_or(line.len());
        styled.push((Style::new().fg(Color::Cyan), line[..name_end].to_string()));

        let mut in_string = None;
        for ch in line[name_end..].chars() {
            let style = match ch {
                '"' | '\'' if in_string == Some(ch) => {
                    in_string = None;
                    Style::new().fg(Color::Green)
                }
                '"' | '\'' if in_string.is_none() => {
                    in_string = Some(ch);
                    Style::new().fg(Color::Green)
                }
                _ if in_string.is_some() => Style::new().fg(Color::Green),
                '0'..='9' | '-' => Style::new().fg(Color::Yellow),
                '(' | ')' | '[' | ']' | ',' => Style::new().fg(Color::White),
                _ => Style::new(),
            };
            styled.push((style, ch.to_string()));
        }
        styled
    }
}

fn run_repl(script: &str) {
    println!("{}", Color::Cyan.bold().paint("jsfunc interactive evaluator"));
    println!("{}", Color::DarkGray.paint("  Call a function from the loaded script, e.g. go([5,9], 4)"));
    println!("{}", Color::DarkGray.paint("  Type :help for available commands"));
    println!();

    let mut line_editor = Reedline::create().with_highlighter(Box::new(CallHighlighter));
    let prompt = DefaultPrompt::new(
        DefaultPromptSegment::Basic("jsfunc".to_string()),
        DefaultPromptSegment::Empty,
    );

    loop {
        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(line)) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed.starts_with(':') {
                    match trimmed {
                        ":help" | ":h" => show_help(),
                        ":funcs" | ":f" => show_functions(script),
                        ":exit" | ":quit" | ":q" => {
                            println!("{}", Color::Cyan.paint("Goodbye!"));
                            break;
                        }
                        _ => println!("{}", Color::Red.paint(format!("Unknown command: {trimmed}"))),
                    }
                    continue;
                }
                evaluate_and_display(script, trimmed);
            }
            Ok(Signal::CtrlC) => {
                println!("{}", Color::Yellow.paint("^C (use :exit to quit)"));
            }
            Ok(Signal::CtrlD) => {
                println!("{}", Color::Cyan.paint("Goodbye!"));
                break;
            }
            Err(err) => {
                eprintln!("{}", Color::Red.paint(format!("Error: {err}")));
                break;
            }
        }
    }
}

fn evaluate_and_display(script: &str, line: &str) {
    let Some((name, args)) = parse_call(line) else {
        println!(
            "{} {}",
            Color::Red.bold().paint("✗"),
            Color::Red.paint("expected a call such as name(arg, ...)")
        );
        return;
    };

    // Each call gets a fresh context; the previous one has released its script text
    match evaluate(script, name, args) {
        Ok(value) => {
            let rendered = match &value {
                Value::Text(text) => Color::Green.paint(format!("\"{text}\"")).to_string(),
                Value::Integer(_) => Color::Yellow.paint(value.to_string()).to_string(),
                _ => Color::White.bold().paint(value.to_string()).to_string(),
            };
            println!("{} {}", Color::Blue.bold().paint("=>"), rendered);
        }
        Err(err) => {
            println!("{} {}", Color::Red.bold().paint("✗"), Color::Red.paint(err.to_string()));
        }
    }
}

fn show_help() {
    println!();
    println!("  {}  Show this help message", Color::Green.paint(":help, :h"));
    println!("  {}  List functions declared in the script", Color::Green.paint(":funcs, :f"));
    println!("  {}  Exit", Color::Green.paint(":exit, :quit, :q"));
    println!();
    println!("  {} Arguments", Color::Yellow.paint("•"));
    println!("    {}    integers: 4, -7", Color::DarkGray.paint("Example:"));
    println!("    {}    arrays: [5,9], [\"a\",\"b\"]", Color::DarkGray.paint("Example:"));
    println!("    {}    text: \"abc\" or bare abc", Color::DarkGray.paint("Example:"));
    println!();
}

fn show_functions(script: &str) {
    let names = function_names(script);
    if names.is_empty() {
        println!("{}", Color::DarkGray.paint("  No functions found in script"));
        return;
    }
    for name in names {
        println!("  {}", Color::Blue.paint(name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_values_parse_by_shape() {
        assert_eq!(parse_host_value("-7"), Value::integer(-7));
        assert_eq!(parse_host_value("\"abc\""), Value::text("abc"));
        assert_eq!(parse_host_value("abc"), Value::text("abc"));
        assert_eq!(
            parse_host_value("[5, [1], x]"),
            Value::array(vec![
                Value::integer(5),
                Value::array(vec![Value::integer(1)]),
                Value::text("x"),
            ])
        );
        assert_eq!(parse_host_value("[]"), Value::array(Vec::new()));
    }

    #[test]
    fn calls_parse_name_and_arguments() {
        let (name, args) = parse_call("go([5,9], 4)").unwrap();
        assert_eq!(name, "go");
        assert_eq!(
            args,
            vec![
                Value::array(vec![Value::integer(5), Value::integer(9)]),
                Value::integer(4)
            ]
        );
        assert!(parse_call("go").is_none());
        assert!(parse_call("(1)").is_none());
    }

    #[test]
    fn evaluates_against_script() {
        let script = "function go(a,b){c=a[0];d=c%b;return d}";
        let (name, args) = parse_call("go([5,9],4)").unwrap();
        assert_eq!(evaluate(script, name, args).unwrap(), Value::integer(1));
    }
}
