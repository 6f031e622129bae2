//! Line-oriented command recognition.
//!
//! Deliberately not a grammar: each line is matched structurally against a
//! fixed set of shapes, and anything else (comments, the preamble, the test
//! block delimiters, hand-written noise) is inert. That keeps replay robust
//! against hand-edited scripts. The recognizer sits behind [`ScriptParser`]
//! so a stricter parser could replace it without touching the executor.

/// One recognized replay command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Navigate { url: String },
    Click { selector: String },
    Fill { selector: String, value: String },
    KeyPress { key: String },
    SelectOption { selector: String, value: String },
    Evaluate { code: String },
    WaitTimeout { ms: u64 },
}

/// Turns script text into executable commands, skipping inert lines.
pub trait ScriptParser: Send + Sync {
    /// Recognized commands paired with their 1-based source line numbers.
    fn parse(&self, text: &str) -> Vec<(usize, Command)>;
}

#[derive(Debug, Default)]
pub struct LineParser;

impl ScriptParser for LineParser {
    fn parse(&self, text: &str) -> Vec<(usize, Command)> {
        text.lines()
            .enumerate()
            .filter_map(|(idx, line)| parse_line(line).map(|cmd| (idx + 1, cmd)))
            .collect()
    }
}

/// Recognize a single line; `None` means the line is inert.
pub fn parse_line(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty()
        || line.starts_with("//")
        || line.starts_with("import ")
        || line.starts_with("test(")
        || line.starts_with('}')
    {
        return None;
    }

    let open = line.find('(')?;
    let name = &line[..open];
    let args = &line[open + 1..];

    match name {
        "navigate" => {
            let (url, _) = take_quoted(args)?;
            Some(Command::Navigate { url })
        }
        "click" => {
            let (selector, _) = take_quoted(args)?;
            Some(Command::Click { selector })
        }
        "keyPress" => {
            let (key, _) = take_quoted(args)?;
            Some(Command::KeyPress { key })
        }
        "evaluate" => {
            let (code, _) = take_quoted(args)?;
            Some(Command::Evaluate { code })
        }
        "fill" => {
            let (selector, rest) = take_quoted(args)?;
            let (value, _) = take_second(rest)?;
            Some(Command::Fill { selector, value })
        }
        "selectOption" => {
            let (selector, rest) = take_quoted(args)?;
            let (value, _) = take_second(rest)?;
            Some(Command::SelectOption { selector, value })
        }
        "waitForTimeout" => {
            let close = args.find(')')?;
            let ms = args[..close].trim().parse().ok()?;
            Some(Command::WaitTimeout { ms })
        }
        _ => None,
    }
}

/// Consume a leading single-quoted string (backslash escapes honored),
/// returning the unescaped value and the remainder after the closing quote.
fn take_quoted(input: &str) -> Option<(String, &str)> {
    let input = input.trim_start();
    let mut chars = input.char_indices();
    match chars.next() {
        Some((_, '\'')) => {}
        _ => return None,
    }

    let mut value = String::new();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, escaped)) => value.push(escaped),
                None => return None,
            },
            '\'' => return Some((value, &input[i + c.len_utf8()..])),
            _ => value.push(c),
        }
    }
    None
}

/// Consume `, '<value>'` after a first argument.
fn take_second(rest: &str) -> Option<(String, &str)> {
    let rest = rest.trim_start();
    let rest = rest.strip_prefix(',')?;
    take_quoted(rest)
}
