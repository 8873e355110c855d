use std::io::{BufRead, Write};

use archdxf_engine::command::{
    CommandArgs, CommandBus, CommandContext, CommandRequest, CommandResponse,
};
use archdxf_engine::session::Session;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::FrontendError;

/// 一行输入对应的命令，例如 `{"name": "draw_line", "args": {"start": [0, 0], "end": [3, 0]}}`。
#[derive(Debug, Deserialize)]
struct WireRequest {
    name: String,
    #[serde(default)]
    args: CommandArgs,
}

#[derive(Debug, Serialize)]
struct WireResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl From<CommandResponse> for WireResponse {
    fn from(response: CommandResponse) -> Self {
        Self {
            success: response.success,
            message: response.message,
            data: response.data,
        }
    }
}

/// 逐行读取 JSON 命令并逐行写出 JSON 响应，直到输入结束。返回处理的命令数。
///
/// 命令按顺序串行执行，因此同一会话不会出现并发修改。
pub fn run_session<R, W>(
    input: R,
    mut output: W,
    bus: &CommandBus,
    session: &mut Session,
) -> Result<usize, FrontendError>
where
    R: BufRead,
    W: Write,
{
    let mut handled = 0;
    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<WireRequest>(line) {
            Ok(wire) => {
                debug!(command = %wire.name, "收到命令");
                let request = CommandRequest {
                    name: wire.name,
                    args: wire.args,
                };
                let mut context = CommandContext {
                    session: &mut *session,
                };
                bus.dispatch(&request, &mut context)
            }
            Err(err) => {
                warn!(error = %err, "无法解析命令");
                CommandResponse::err(format!("malformed command: {err}"))
            }
        };

        serde_json::to_writer(&mut output, &WireResponse::from(response))?;
        output.write_all(b"\n")?;
        output.flush()?;
        handled += 1;
    }
    info!(handled, "命令输入已结束");
    Ok(handled)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use serde_json::json;

    use super::*;

    fn responses(output: &[u8]) -> Vec<Value> {
        String::from_utf8_lossy(output)
            .lines()
            .map(|line| serde_json::from_str(line).expect("response is JSON"))
            .collect()
    }

    #[test]
    fn each_line_gets_one_response() {
        let input = concat!(
            "{\"name\":\"new_project\"}\n",
            "\n",
            "{\"name\":\"draw_line\",\"args\":{\"start\":[0,0],\"end\":[3,0]}}\n",
            "not json\n",
            "{\"name\":\"draw_circle\",\"args\":{\"center\":[0,0],\"radius\":-1}}\n",
        );
        let bus = CommandBus::new();
        let mut session = Session::new();
        let mut output = Vec::new();

        let handled =
            run_session(Cursor::new(input), &mut output, &bus, &mut session).expect("run");
        assert_eq!(handled, 4);

        let responses = responses(&output);
        assert_eq!(responses.len(), 4);
        assert_eq!(
            responses[0],
            json!({ "success": true, "message": "New project started. Canvas is empty." })
        );
        assert_eq!(
            responses[1],
            json!({ "success": true, "message": "Line added.", "data": { "id": 0 } })
        );
        assert_eq!(responses[2]["success"], false);
        assert!(
            responses[2]["message"]
                .as_str()
                .is_some_and(|message| message.starts_with("malformed command"))
        );
        assert_eq!(responses[3]["success"], false);
        assert_eq!(session.document().entity_count(), 1);
    }
}
