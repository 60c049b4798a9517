use super::{Interrupts, load_config};
use devops_core::{Action, ComponentId};
use devops_exec::{CommandExecutor, ExecuteOptions, Runner};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;

pub async fn interactive(config_path: Option<&Path>) -> anyhow::Result<ExitCode> {
    let config = load_config(config_path)?;
    let runner = Runner::new(config);
    let interrupts = Interrupts::install();

    let stdin = io::stdin();
    Menu::new(&runner, &interrupts, stdin.lock(), io::stdout(), io::stderr())
        .run()
        .await?;

    Ok(ExitCode::SUCCESS)
}

/// One action against one component, as picked from the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Selection {
    pub component: ComponentId,
    pub action: Action,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MenuState {
    MenuDisplayed,
    AwaitingInput,
    Executing(Selection),
    Done,
}

#[derive(Debug, PartialEq, Eq)]
enum Choice {
    Run(Selection),
    Exit,
}

/// `0` exits; `f1`..`f5` / `b1`..`b5` pick an action for frontend / backend.
fn parse_choice(input: &str) -> Option<Choice> {
    let input = input.trim();
    if input == "0" {
        return Some(Choice::Exit);
    }

    let mut chars = input.chars();
    let component = match chars.next()?.to_ascii_lowercase() {
        'f' => ComponentId::Frontend,
        'b' => ComponentId::Backend,
        _ => return None,
    };
    let action = match chars.as_str() {
        "1" => Action::Build,
        "2" => Action::Run,
        "3" => Action::Push,
        "4" => Action::Deploy,
        "5" => Action::Release,
        _ => return None,
    };
    Some(Choice::Run(Selection { component, action }))
}

fn describe(action: Action) -> &'static str {
    match action {
        Action::Build => "Build image",
        Action::Run => "Run latest image",
        Action::Push => "Push latest image to ECR",
        Action::Deploy => "Deploy latest image to ECS",
        Action::Release => "Build, push, and deploy",
    }
}

/// The interactive loop. Each step moves between [`MenuState`]s; invalid input
/// always goes back through `MenuDisplayed` after a diagnostic.
pub(crate) struct Menu<'a, E: CommandExecutor, R, W, X> {
    runner: &'a Runner<E>,
    interrupts: &'a Interrupts,
    input: R,
    out: W,
    err: X,
}

impl<'a, E, R, W, X> Menu<'a, E, R, W, X>
where
    E: CommandExecutor,
    R: BufRead,
    W: Write,
    X: Write,
{
    pub(crate) fn new(
        runner: &'a Runner<E>,
        interrupts: &'a Interrupts,
        input: R,
        out: W,
        err: X,
    ) -> Self {
        Self {
            runner,
            interrupts,
            input,
            out,
            err,
        }
    }

    pub(crate) async fn run(mut self) -> io::Result<()> {
        let mut state = MenuState::MenuDisplayed;
        loop {
            state = match state {
                MenuState::MenuDisplayed => {
                    self.render()?;
                    MenuState::AwaitingInput
                }
                MenuState::AwaitingInput => self.read_choice()?,
                MenuState::Executing(selection) => {
                    self.execute(selection).await?;
                    MenuState::MenuDisplayed
                }
                MenuState::Done => return Ok(()),
            };
        }
    }

    fn render(&mut self) -> io::Result<()> {
        writeln!(self.out)?;
        for component in ComponentId::ALL {
            let key = match component {
                ComponentId::Frontend => 'f',
                ComponentId::Backend => 'b',
            };
            writeln!(self.out, "{component}:")?;
            for (n, action) in Action::ALL.into_iter().enumerate() {
                writeln!(self.out, "  {key}{}) {}", n + 1, describe(action))?;
            }
        }
        writeln!(self.out, "  0) Exit")
    }

    fn read_choice(&mut self) -> io::Result<MenuState> {
        write!(self.out, "Select an option: ")?;
        self.out.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            // End of input behaves like `0`.
            writeln!(self.out)?;
            return Ok(MenuState::Done);
        }

        Ok(match parse_choice(&line) {
            Some(Choice::Exit) => MenuState::Done,
            Some(Choice::Run(selection)) => MenuState::Executing(selection),
            None => {
                writeln!(self.out, "Invalid option '{}', try again.", line.trim())?;
                MenuState::MenuDisplayed
            }
        })
    }

    async fn execute(&mut self, selection: Selection) -> io::Result<()> {
        let cancel = self.interrupts.begin().await;
        let result = self
            .runner
            .execute(
                selection.action,
                selection.component,
                &ExecuteOptions::default(),
                &cancel,
            )
            .await;
        self.interrupts.end().await;

        if let Err(e) = result {
            writeln!(self.err, "Action failed: {e}")?;
        }
        Ok(())
    }
}
