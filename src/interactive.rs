// Line-oriented front end for the list screen

use crate::screen::{ListScreen, Prompt, PromptResult, ScreenEvent};
use colored::Colorize;
use eyre::{Result, eyre};
use std::io::{self, BufRead, Write};
use std::str::FromStr;
use tracing::debug;

pub const SCREEN_TITLE: &str = "Task List";
const CANCEL: &str = ":cancel";

/// A command typed at the list screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Add,
    /// 1-based row
    Edit(usize),
    /// 1-based row
    Delete(usize),
    List,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let Some(word) = parts.next() else {
            return Ok(Command::List);
        };
        let arg = parts.next();
        if parts.next().is_some() {
            return Err(eyre!("Too many arguments: {}", s.trim()));
        }

        let row = |arg: Option<&str>| -> Result<usize> {
            let arg = arg.ok_or_else(|| eyre!("Missing row number"))?;
            match arg.parse::<usize>() {
                Ok(n) if n > 0 => Ok(n),
                _ => Err(eyre!("Invalid row number: {}", arg)),
            }
        };

        let command = match word {
            "a" | "add" => Command::Add,
            "e" | "edit" => return Ok(Command::Edit(row(arg)?)),
            "d" | "delete" => return Ok(Command::Delete(row(arg)?)),
            "l" | "list" => Command::List,
            "h" | "help" | "?" => Command::Help,
            "q" | "quit" | "exit" => Command::Quit,
            other => return Err(eyre!("Unknown command: {}", other)),
        };

        if let Some(extra) = arg {
            return Err(eyre!("Unexpected argument: {}", extra));
        }
        Ok(command)
    }
}

/// Write the screen title and numbered rows
pub fn print_rows<W: Write>(screen: &ListScreen, out: &mut W) -> Result<()> {
    writeln!(out, "{}", SCREEN_TITLE.bold())?;
    if screen.row_count() == 0 {
        writeln!(out, "  {}", "(no tasks)".dimmed())?;
    }
    for (i, task) in screen.rows().iter().enumerate() {
        writeln!(out, "{}. {}", format!("{:>3}", i + 1).as_str().cyan(), task.title)?;
    }
    Ok(())
}

fn print_help<W: Write>(out: &mut W) -> Result<()> {
    writeln!(out, "Commands:")?;
    writeln!(out, "  a, add        add a task")?;
    writeln!(out, "  e, edit N     rename task N")?;
    writeln!(out, "  d, delete N   delete task N")?;
    writeln!(out, "  l, list       show the list")?;
    writeln!(out, "  q, quit       leave")?;
    writeln!(out, "At a prompt, type {} to cancel.", CANCEL)?;
    Ok(())
}

/// Ask the open prompt's question and read the answer
///
/// End of input counts as Cancel.
fn ask<R: BufRead, W: Write>(prompt: &Prompt, input: &mut R, out: &mut W) -> Result<PromptResult> {
    writeln!(out, "{}", prompt.title.bold())?;
    writeln!(out, "{}", prompt.message)?;
    if prompt.initial.is_empty() {
        write!(out, "{} ", format!("[{}]>", prompt.placeholder).as_str().dimmed())?;
    } else {
        write!(out, "{} ", format!("[{}]>", prompt.initial).as_str().dimmed())?;
    }
    out.flush()?;

    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) => return Ok(PromptResult::Cancel),
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::InvalidData => {
            writeln!(out)?;
            debug!(error = ?e, "Unreadable prompt answer, cancelling");
            return Ok(PromptResult::Cancel);
        }
        Err(e) => return Err(e.into()),
    }
    let text = line.trim_end_matches(['\r', '\n']);
    if text.trim() == CANCEL {
        return Ok(PromptResult::Cancel);
    }
    Ok(PromptResult::Save(text.to_string()))
}

fn report<W: Write>(event: ScreenEvent, out: &mut W) -> Result<()> {
    debug!(?event, "Screen event");
    if event == ScreenEvent::Unchanged {
        writeln!(out, "{}", "No changes.".dimmed())?;
    }
    Ok(())
}

/// Add a task without prompting, rejecting an empty title
pub fn add_task(screen: &mut ListScreen, title: String) -> Result<ScreenEvent> {
    if title.is_empty() {
        return Err(eyre!("Task title cannot be empty"));
    }
    screen.open_add()?;
    screen.resolve(PromptResult::Save(title))
}

/// Rename the task at a 1-based row without prompting, rejecting an empty title
pub fn edit_task(screen: &mut ListScreen, row: usize, title: String) -> Result<ScreenEvent> {
    if title.is_empty() {
        return Err(eyre!("Task title cannot be empty"));
    }
    let index = row.checked_sub(1).ok_or_else(|| eyre!("Rows are numbered from 1"))?;
    screen.open_edit(index)?;
    screen.resolve(PromptResult::Save(title))
}

/// Run the list screen until `quit` or end of input
pub fn run<R: BufRead, W: Write>(screen: &mut ListScreen, mut input: R, out: &mut W) -> Result<()> {
    print_rows(screen, out)?;

    loop {
        write!(out, "{} ", ">".green())?;
        out.flush()?;

        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) => {
                writeln!(out)?;
                break;
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                writeln!(out, "{} input is not valid UTF-8", "error:".red())?;
                continue;
            }
            Err(e) => return Err(e.into()),
        }

        let command = match line.parse::<Command>() {
            Ok(c) => c,
            Err(e) => {
                writeln!(out, "{} {}", "error:".red(), e)?;
                continue;
            }
        };

        let outcome = match command {
            Command::Quit => break,
            Command::Help => {
                print_help(out)?;
                continue;
            }
            Command::List => {
                screen.reload();
                print_rows(screen, out)?;
                continue;
            }
            Command::Add => screen.open_add(),
            Command::Edit(n) => screen.open_edit(n - 1),
            Command::Delete(n) => match screen.delete(n - 1) {
                Ok(event) => {
                    report(event, out)?;
                    print_rows(screen, out)?;
                    continue;
                }
                Err(e) => Err(e),
            },
        };

        let prompt = match outcome {
            Ok(prompt) => prompt,
            Err(e) => {
                writeln!(out, "{} {}", "error:".red(), e)?;
                continue;
            }
        };

        let answer = ask(&prompt, &mut input, out)?;
        let event = screen.resolve(answer)?;
        report(event, out)?;
        print_rows(screen, out)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::Reconcile;
    use crate::store::Store;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn run_script(temp: &TempDir, script: &str) -> (ListScreen, String) {
        let mut screen = ListScreen::new(Store::open(temp.path()).unwrap(), Reconcile::Splice);
        let mut out = Vec::new();
        run(&mut screen, Cursor::new(script.to_string()), &mut out).unwrap();
        (screen, String::from_utf8(out).unwrap())
    }

    fn titles(screen: &ListScreen) -> Vec<&str> {
        screen.rows().iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("a".parse::<Command>().unwrap(), Command::Add);
        assert_eq!("add\n".parse::<Command>().unwrap(), Command::Add);
        assert_eq!("e 2".parse::<Command>().unwrap(), Command::Edit(2));
        assert_eq!("delete 10".parse::<Command>().unwrap(), Command::Delete(10));
        assert_eq!("".parse::<Command>().unwrap(), Command::List);
        assert_eq!("q".parse::<Command>().unwrap(), Command::Quit);
        assert_eq!("?".parse::<Command>().unwrap(), Command::Help);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("e".parse::<Command>().is_err());
        assert!("e 0".parse::<Command>().is_err());
        assert!("d two".parse::<Command>().is_err());
        assert!("a extra".parse::<Command>().is_err());
        assert!("e 1 2".parse::<Command>().is_err());
        assert!("frobnicate".parse::<Command>().is_err());
    }

    #[test]
    fn test_add_edit_delete_session() {
        let temp = TempDir::new().unwrap();
        let script = "a\nBuy milk\na\nWalk dog\ne 1\nBuy oat milk\nd 2\nq\n";

        let (screen, out) = run_script(&temp, script);

        assert_eq!(titles(&screen), vec!["Buy oat milk"]);
        assert!(out.contains("What would you like to do?"));
        assert!(out.contains("Edit task name:"));
        assert!(out.contains("[Buy milk]>"));
        assert_eq!(screen.store().fetch_all().len(), 1);
    }

    #[test]
    fn test_cancel_and_empty_title_create_nothing() {
        let temp = TempDir::new().unwrap();
        let script = "a\n:cancel\na\n\nq\n";

        let (screen, out) = run_script(&temp, script);

        assert_eq!(screen.row_count(), 0);
        assert!(screen.store().fetch_all().is_empty());
        assert!(out.contains("No changes."));
    }

    #[test]
    fn test_end_of_input_at_prompt_cancels() {
        let temp = TempDir::new().unwrap();

        let (screen, _) = run_script(&temp, "a\n");

        assert_eq!(screen.row_count(), 0);
        assert!(screen.prompt().is_none());
    }

    #[test]
    fn test_invalid_utf8_is_skipped() {
        let temp = TempDir::new().unwrap();
        let mut screen = ListScreen::new(Store::open(temp.path()).unwrap(), Reconcile::Refetch);
        let mut script = Vec::new();
        script.extend_from_slice(b"\xff\xfe\n");
        script.extend_from_slice(b"a\n\xc3\x28\n");
        script.extend_from_slice(b"a\nkept\nq\n");

        let mut out = Vec::new();
        run(&mut screen, Cursor::new(script), &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert_eq!(titles(&screen), vec!["kept"]);
        assert!(out.contains("not valid UTF-8"));
        assert!(out.contains("No changes."));
        assert_eq!(screen.store().fetch_all().len(), 1);
    }

    #[test]
    fn test_add_task_rejects_empty_title() {
        let temp = TempDir::new().unwrap();
        let mut screen = ListScreen::new(Store::open(temp.path()).unwrap(), Reconcile::Refetch);

        assert!(add_task(&mut screen, String::new()).is_err());
        assert!(screen.prompt().is_none());
        assert!(screen.store().fetch_all().is_empty());
        assert!(!screen.store().journal_path().exists());

        assert_eq!(add_task(&mut screen, "Buy milk".to_string()).unwrap(), ScreenEvent::Reloaded);
        assert_eq!(titles(&screen), vec!["Buy milk"]);
    }

    #[test]
    fn test_edit_task_rejects_empty_title_and_bad_rows() {
        let temp = TempDir::new().unwrap();
        let mut screen = ListScreen::new(Store::open(temp.path()).unwrap(), Reconcile::Splice);
        add_task(&mut screen, "original".to_string()).unwrap();

        assert!(edit_task(&mut screen, 1, String::new()).is_err());
        assert!(edit_task(&mut screen, 0, "zero".to_string()).is_err());
        assert!(edit_task(&mut screen, 2, "missing".to_string()).is_err());
        assert!(screen.prompt().is_none());
        assert_eq!(screen.store().fetch_all()[0].title, "original");

        assert_eq!(edit_task(&mut screen, 1, "renamed".to_string()).unwrap(), ScreenEvent::Updated(0));
        assert_eq!(titles(&screen), vec!["renamed"]);
    }

    #[test]
    fn test_bad_commands_keep_running() {
        let temp = TempDir::new().unwrap();
        let script = "e 3\nbogus\nd 1\na\nstill works\n";

        let (screen, out) = run_script(&temp, script);

        assert_eq!(titles(&screen), vec!["still works"]);
        assert!(out.contains("out of range"));
        assert!(out.contains("Unknown command"));
    }
}
