//! 标准输入指令读取
//!
//! 每行一条 JSON 指令，例如：
//!
//! ```text
//! {"type":"throttle","enabled":true,"pedal_percent":40}
//! {"type":"brake","enabled":false,"pedal_percent":0}
//! {"type":"steering","enabled":true,"angle_degrees":-12.5}
//! ```
//!
//! 空行和以 `#` 开头的行被忽略。

use crossbeam_channel::Sender;
use dbw_driver::DbwCommand;
use std::io::BufRead;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// 解析一行输入
pub fn parse_command_line(line: &str) -> Result<Option<DbwCommand>, serde_json::Error> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(trimmed).map(Some)
}

/// 逐行读取指令并转发，输入结束（EOF）或接收端关闭时退出
pub fn forward_commands(reader: impl BufRead, commands: &Sender<DbwCommand>) -> usize {
    let mut forwarded = 0;
    for (index, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to read command input: {}", e);
                break;
            },
        };

        match parse_command_line(&line) {
            Ok(Some(cmd)) => {
                debug!("Command received: {:?}", cmd);
                if commands.send(cmd).is_err() {
                    break;
                }
                forwarded += 1;
            },
            Ok(None) => {},
            Err(e) => warn!("Ignoring invalid command on line {}: {}", index + 1, e),
        }
    }
    forwarded
}

/// 启动 stdin 读取线程
pub fn spawn_stdin_reader(commands: Sender<DbwCommand>) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("dbw-stdin".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            let count = forward_commands(stdin.lock(), &commands);
            info!("Command input closed after {} commands", count);
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::io::Cursor;

    #[test]
    fn test_parse_command_line() {
        assert_eq!(parse_command_line("").unwrap(), None);
        assert_eq!(parse_command_line("   # comment").unwrap(), None);
        assert_eq!(
            parse_command_line(r#" {"type":"brake","enabled":true,"pedal_percent":20} "#).unwrap(),
            Some(DbwCommand::brake(true, 20.0))
        );
        assert!(parse_command_line("{not json}").is_err());
    }

    #[test]
    fn test_forward_commands_skips_bad_lines() {
        let input = Cursor::new(
            "{\"type\":\"throttle\",\"enabled\":true,\"pedal_percent\":40}\n\
             garbage\n\
             \n\
             {\"type\":\"steering\",\"enabled\":true,\"angle_degrees\":-3.5}\n",
        );
        let (tx, rx) = unbounded();

        assert_eq!(forward_commands(input, &tx), 2);
        assert_eq!(rx.try_recv().unwrap(), DbwCommand::throttle(true, 40.0));
        assert_eq!(rx.try_recv().unwrap(), DbwCommand::steering(true, -3.5));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_forward_commands_stops_when_receiver_gone() {
        let input = Cursor::new(
            "{\"type\":\"brake\",\"enabled\":true,\"pedal_percent\":1}\n\
             {\"type\":\"brake\",\"enabled\":true,\"pedal_percent\":2}\n",
        );
        let (tx, rx) = unbounded();
        drop(rx);
        assert_eq!(forward_commands(input, &tx), 0);
    }
}
