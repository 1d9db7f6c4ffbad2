//! Line-oriented script language understood by [`MemoryScene`](super::memory::MemoryScene).
//!
//! One command per line, `#` starts a comment, blank lines are ignored.
//! `{self}` expands to the name of the text being run (the override context).
//!
//! | Command                         | Effect                               |
//! |---------------------------------|--------------------------------------|
//! | `add_object <name> <TYPE>`      | create an object in the active scene |
//! | `delete_object <name>`          | remove an object everywhere          |
//! | `rename_object <old> <new>`     | rename in place                      |
//! | `link <object> <collection>`    | add object to a collection           |
//! | `set_metallic <material> <v>`   | set metallic factor                  |
//! | `set_roughness <material> <v>`  | set roughness factor                 |
//! | `log <text...>`                 | write to the log                     |
//! | `fail <text...>`                | abort with an error                  |

use anyhow::{Context, Result, anyhow, bail};

/// Parsed script command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddObject { name: String, type_tag: String },
    DeleteObject(String),
    RenameObject { from: String, to: String },
    Link { object: String, collection: String },
    SetMetallic { material: String, value: f32 },
    SetRoughness { material: String, value: f32 },
    Log(String),
    Fail(String),
}

/// Parse a whole script. `this` is substituted for `{self}`.
pub fn parse(source: &str, this: &str) -> Result<Vec<Command>> {
    let mut commands = Vec::new();
    for (index, raw) in source.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.replace("{self}", this);
        let command = parse_line(&line).with_context(|| format!("line {}: {}", index + 1, raw.trim()))?;
        commands.push(command);
    }
    Ok(commands)
}

fn parse_line(line: &str) -> Result<Command> {
    let (op, rest) = match line.split_once(char::is_whitespace) {
        Some((op, rest)) => (op, rest.trim()),
        None => (line, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    let command = match op {
        "add_object" => {
            let [name, type_tag] = exact::<2>(&args, op)?;
            Command::AddObject { name: name.to_string(), type_tag: type_tag.to_uppercase() }
        }
        "delete_object" => {
            let [name] = exact::<1>(&args, op)?;
            Command::DeleteObject(name.to_string())
        }
        "rename_object" => {
            let [from, to] = exact::<2>(&args, op)?;
            Command::RenameObject { from: from.to_string(), to: to.to_string() }
        }
        "link" => {
            let [object, collection] = exact::<2>(&args, op)?;
            Command::Link { object: object.to_string(), collection: collection.to_string() }
        }
        "set_metallic" | "set_roughness" => {
            let [material, value] = exact::<2>(&args, op)?;
            let value: f32 = value.parse().map_err(|_| anyhow!("{} expects a number, got '{}'", op, value))?;
            let material = material.to_string();
            if op == "set_metallic" {
                Command::SetMetallic { material, value }
            } else {
                Command::SetRoughness { material, value }
            }
        }
        "log" => Command::Log(rest.to_string()),
        "fail" => Command::Fail(rest.to_string()),
        other => bail!("unknown command '{}'", other),
    };
    Ok(command)
}

fn exact<'a, const N: usize>(args: &[&'a str], op: &str) -> Result<[&'a str; N]> {
    <[&str; N]>::try_from(args).map_err(|_| anyhow!("{} expects {} argument(s), got {}", op, N, args.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let source = "# setup\n\nadd_object Box mesh\nlink Box Props\nset_metallic Red 0.25\nlog hello world\n";
        let commands = parse(source, "setup.py").unwrap();
        assert_eq!(
            commands,
            vec![
                Command::AddObject { name: "Box".into(), type_tag: "MESH".into() },
                Command::Link { object: "Box".into(), collection: "Props".into() },
                Command::SetMetallic { material: "Red".into(), value: 0.25 },
                Command::Log("hello world".into()),
            ]
        );
    }

    #[test]
    fn test_self_expansion() {
        let commands = parse("log running {self}", "build.py").unwrap();
        assert_eq!(commands, vec![Command::Log("running build.py".into())]);
    }

    #[test]
    fn test_unknown_command_reports_line() {
        let err = parse("log ok\nexplode now", "x").unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("line 2"), "{}", msg);
        assert!(msg.contains("unknown command 'explode'"), "{}", msg);
    }

    #[test]
    fn test_argument_count_checked() {
        assert!(parse("rename_object OnlyOne", "x").is_err());
        assert!(parse("delete_object A B", "x").is_err());
        assert!(parse("set_roughness Red rough", "x").is_err());
    }
}
