use std::collections::HashMap;

use archdxf_core::document::{
    ColorIndex, LAYER_CURVE, LAYER_FURNITURE, LAYER_TEXT, LAYER_WALL,
};
use archdxf_core::geometry::Point2;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::errors::EngineError;
use crate::session::Session;

pub type CommandArgs = Map<String, Value>;

#[derive(Debug, Clone, Default)]
pub struct CommandRequest {
    pub name: String,
    pub args: CommandArgs,
}

impl CommandRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: CommandArgs::new(),
        }
    }

    pub fn arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<Value>,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<CommandResponse, EngineError>;
}

pub struct CommandContext<'a> {
    pub session: &'a mut Session,
}

pub struct CommandBus {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl CommandBus {
    pub fn new() -> Self {
        let mut bus = Self {
            handlers: HashMap::new(),
        };
        bus.register(NewProjectCommand);
        bus.register(DrawLineCommand);
        bus.register(DrawPolylineCommand);
        bus.register(DrawArcCommand);
        bus.register(DrawCircleCommand);
        bus.register(AddTextCommand);
        bus.register(AddLayerCommand);
        bus.register(SetLayerCommand);
        bus.register(StatusCommand);
        bus.register(SaveFileCommand);
        bus
    }

    pub fn register<H: CommandHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.name(), Box::new(handler));
    }

    /// 执行命令。参数或文档错误会转成失败响应，会话保持可用。
    pub fn dispatch(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let Some(handler) = self.handlers.get(request.name.as_str()) else {
            warn!(command = %request.name, "未知命令");
            return CommandResponse::err(format!("unknown command: {}", request.name));
        };
        match handler.execute(request, context) {
            Ok(response) => {
                debug!(command = %request.name, "命令执行成功");
                response
            }
            Err(err) => {
                warn!(command = %request.name, error = %err, "命令执行失败");
                CommandResponse::err(err.to_string())
            }
        }
    }

    /// 已注册命令名，按字母序排列。
    pub fn available_commands(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

struct NewProjectCommand;

impl CommandHandler for NewProjectCommand {
    fn name(&self) -> &'static str {
        "new_project"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<CommandResponse, EngineError> {
        context.session.reset();
        Ok(CommandResponse::ok("New project started. Canvas is empty."))
    }
}

struct DrawLineCommand;

impl CommandHandler for DrawLineCommand {
    fn name(&self) -> &'static str {
        "draw_line"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<CommandResponse, EngineError> {
        let args = &request.args;
        let start = point_arg(args, "start")?;
        let end = point_arg(args, "end")?;
        let layer = string_or(args, "layer", LAYER_WALL)?;

        let document = context.session.document_mut();
        let id = document.add_line(start, end, layer)?;
        document.set_active_layer(layer)?;
        Ok(CommandResponse::ok("Line added.").with_data(json!({ "id": id.get() })))
    }
}

struct DrawPolylineCommand;

impl CommandHandler for DrawPolylineCommand {
    fn name(&self) -> &'static str {
        "draw_polyline"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<CommandResponse, EngineError> {
        let args = &request.args;
        let points = points_arg(args, "points")?;
        let closed = bool_or(args, "closed", true)?;
        let layer = string_or(args, "layer", LAYER_WALL)?;

        let document = context.session.document_mut();
        let id = document.add_polyline(points, closed, layer)?;
        document.set_active_layer(layer)?;
        Ok(CommandResponse::ok("Polyline added.").with_data(json!({ "id": id.get() })))
    }
}

struct DrawArcCommand;

impl CommandHandler for DrawArcCommand {
    fn name(&self) -> &'static str {
        "draw_arc"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<CommandResponse, EngineError> {
        let args = &request.args;
        let center = point_arg(args, "center")?;
        let radius = number_arg(args, "radius")?;
        let start_angle = number_arg(args, "start_angle")?;
        let end_angle = number_arg(args, "end_angle")?;
        let layer = string_or(args, "layer", LAYER_CURVE)?;

        let document = context.session.document_mut();
        let id = document.add_arc(center, radius, start_angle, end_angle, layer)?;
        document.set_active_layer(layer)?;
        Ok(CommandResponse::ok("Arc added.").with_data(json!({ "id": id.get() })))
    }
}

struct DrawCircleCommand;

impl CommandHandler for DrawCircleCommand {
    fn name(&self) -> &'static str {
        "draw_circle"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<CommandResponse, EngineError> {
        let args = &request.args;
        let center = point_arg(args, "center")?;
        let radius = number_arg(args, "radius")?;
        let layer = string_or(args, "layer", LAYER_FURNITURE)?;

        let document = context.session.document_mut();
        let id = document.add_circle(center, radius, layer)?;
        document.set_active_layer(layer)?;
        Ok(CommandResponse::ok("Circle added.").with_data(json!({ "id": id.get() })))
    }
}

struct AddTextCommand;

impl CommandHandler for AddTextCommand {
    fn name(&self) -> &'static str {
        "add_text"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<CommandResponse, EngineError> {
        let args = &request.args;
        let text = string_arg(args, "text")?;
        let position = point_arg(args, "position")?;
        let default_height = context.session.options().default_text_height;
        let height = number_or(args, "height", default_height)?;
        let layer = string_or(args, "layer", LAYER_TEXT)?;

        let document = context.session.document_mut();
        let id = document.add_text(position, text, height, layer)?;
        document.set_active_layer(layer)?;
        Ok(CommandResponse::ok(format!("Text '{text}' added.")).with_data(json!({ "id": id.get() })))
    }
}

struct AddLayerCommand;

impl CommandHandler for AddLayerCommand {
    fn name(&self) -> &'static str {
        "add_layer"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<CommandResponse, EngineError> {
        let args = &request.args;
        let name = string_arg(args, "name")?;
        let color = color_arg(args, "color")?;

        context.session.document_mut().add_layer(name, color)?;
        Ok(CommandResponse::ok(format!("Layer '{name}' added.")))
    }
}

struct SetLayerCommand;

impl CommandHandler for SetLayerCommand {
    fn name(&self) -> &'static str {
        "set_layer"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<CommandResponse, EngineError> {
        let name = string_arg(&request.args, "name")?;
        context.session.document_mut().set_active_layer(name)?;
        Ok(CommandResponse::ok(format!("Active layer is now '{name}'.")))
    }
}

struct StatusCommand;

impl CommandHandler for StatusCommand {
    fn name(&self) -> &'static str {
        "status"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<CommandResponse, EngineError> {
        let document = context.session.document();
        let layers: Vec<_> = document.layers().collect();
        let data = json!({
            "active_layer": document.active_layer(),
            "layers": layers,
            "entity_count": document.entity_count(),
        });
        Ok(CommandResponse::ok(format!(
            "{} layers, {} entities.",
            document.layer_count(),
            document.entity_count()
        ))
        .with_data(data))
    }
}

struct SaveFileCommand;

impl CommandHandler for SaveFileCommand {
    fn name(&self) -> &'static str {
        "save_file"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<CommandResponse, EngineError> {
        let filename = optional_string(&request.args, "filename")?;
        let path = context.session.save(filename)?;
        let shown = path.display().to_string();
        Ok(
            CommandResponse::ok(format!("File saved successfully at: {shown}"))
                .with_data(json!({ "path": shown })),
        )
    }
}

fn required<'a>(args: &'a CommandArgs, key: &str) -> Result<&'a Value, EngineError> {
    args.get(key)
        .ok_or_else(|| EngineError::MissingArgument(key.to_string()))
}

fn as_number(value: &Value, name: &str) -> Result<f64, EngineError> {
    value
        .as_f64()
        .ok_or_else(|| EngineError::invalid(name, "must be a number"))
}

fn number_arg(args: &CommandArgs, key: &str) -> Result<f64, EngineError> {
    as_number(required(args, key)?, key)
}

fn number_or(args: &CommandArgs, key: &str, default: f64) -> Result<f64, EngineError> {
    match args.get(key) {
        Some(value) => as_number(value, key),
        None => Ok(default),
    }
}

fn string_arg<'a>(args: &'a CommandArgs, key: &str) -> Result<&'a str, EngineError> {
    required(args, key)?
        .as_str()
        .ok_or_else(|| EngineError::invalid(key, "must be a string"))
}

fn optional_string<'a>(args: &'a CommandArgs, key: &str) -> Result<Option<&'a str>, EngineError> {
    match args.get(key) {
        Some(value) => value
            .as_str()
            .map(Some)
            .ok_or_else(|| EngineError::invalid(key, "must be a string")),
        None => Ok(None),
    }
}

fn string_or<'a>(
    args: &'a CommandArgs,
    key: &str,
    default: &'a str,
) -> Result<&'a str, EngineError> {
    Ok(optional_string(args, key)?.unwrap_or(default))
}

fn bool_or(args: &CommandArgs, key: &str, default: bool) -> Result<bool, EngineError> {
    match args.get(key) {
        Some(value) => value
            .as_bool()
            .ok_or_else(|| EngineError::invalid(key, "must be a boolean")),
        None => Ok(default),
    }
}

/// `[x, y]` 形式的坐标。
fn parse_point(value: &Value, name: &str) -> Result<Point2, EngineError> {
    let items = value
        .as_array()
        .ok_or_else(|| EngineError::invalid(name, "must be an array"))?;
    if items.len() != 2 {
        return Err(EngineError::invalid(name, "must have exactly 2 elements"));
    }
    let x = as_number(&items[0], &format!("{name}[0]"))?;
    let y = as_number(&items[1], &format!("{name}[1]"))?;
    Ok(Point2::from([x, y]))
}

fn point_arg(args: &CommandArgs, key: &str) -> Result<Point2, EngineError> {
    parse_point(required(args, key)?, key)
}

fn points_arg(args: &CommandArgs, key: &str) -> Result<Vec<Point2>, EngineError> {
    required(args, key)?
        .as_array()
        .ok_or_else(|| EngineError::invalid(key, "must be an array"))?
        .iter()
        .enumerate()
        .map(|(index, value)| parse_point(value, &format!("{key}[{index}]")))
        .collect()
}

fn color_arg(args: &CommandArgs, key: &str) -> Result<ColorIndex, EngineError> {
    let raw = required(args, key)?
        .as_u64()
        .ok_or_else(|| EngineError::invalid(key, "must be a positive integer"))?;
    let index = u8::try_from(raw).map_err(|_| EngineError::invalid(key, "must be at most 255"))?;
    Ok(ColorIndex::new(index)?)
}

#[cfg(test)]
mod tests {
    use archdxf_core::document::Entity;
    use serde_json::json;

    use super::*;
    use crate::session::{Session, SessionOptions};

    fn run(bus: &CommandBus, session: &mut Session, request: CommandRequest) -> CommandResponse {
        let mut context = CommandContext { session };
        bus.dispatch(&request, &mut context)
    }

    #[test]
    fn room_commands_build_the_document() {
        let bus = CommandBus::new();
        let mut session = Session::new();

        let response = run(&bus, &mut session, CommandRequest::new("new_project"));
        assert!(response.success);

        let response = run(
            &bus,
            &mut session,
            CommandRequest::new("draw_polyline")
                .arg("points", json!([[0, 0], [3, 0], [3, 5], [0, 5]])),
        );
        assert!(response.success, "{:?}", response.message);
        assert_eq!(response.data, Some(json!({ "id": 0 })));

        let response = run(
            &bus,
            &mut session,
            CommandRequest::new("add_text")
                .arg("text", "3x5m Room")
                .arg("position", json!([1.5, 2.5])),
        );
        assert!(response.success);
        assert_eq!(response.message.as_deref(), Some("Text '3x5m Room' added."));

        let document = session.document();
        assert_eq!(document.entity_count(), 2);
        assert_eq!(document.active_layer(), LAYER_TEXT);

        let records: Vec<_> = document.entities().collect();
        assert_eq!(records[0].layer, LAYER_WALL);
        match &records[0].entity {
            Entity::Polyline(polyline) => {
                assert!(polyline.closed);
                assert_eq!(polyline.vertices.len(), 4);
            }
            other => panic!("expected polyline, got {other:?}"),
        }
        match &records[1].entity {
            Entity::Text(text) => assert!((text.height - 0.2).abs() < f64::EPSILON),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn command_defaults_pick_layers() {
        let bus = CommandBus::new();
        let mut session = Session::new();

        for request in [
            CommandRequest::new("draw_line")
                .arg("start", json!([0, 0]))
                .arg("end", json!([1, 0])),
            CommandRequest::new("draw_arc")
                .arg("center", json!([0, 0]))
                .arg("radius", 0.9)
                .arg("start_angle", 0)
                .arg("end_angle", 90),
            CommandRequest::new("draw_circle")
                .arg("center", json!([2, 2]))
                .arg("radius", 0.4),
        ] {
            let response = run(&bus, &mut session, request);
            assert!(response.success, "{:?}", response.message);
        }

        let layers: Vec<&str> = session
            .document()
            .entities()
            .map(|record| record.layer.as_str())
            .collect();
        assert_eq!(layers, [LAYER_WALL, LAYER_CURVE, LAYER_FURNITURE]);
    }

    #[test]
    fn failures_leave_the_session_untouched() {
        let bus = CommandBus::new();
        let mut session = Session::new();

        let cases = [
            (CommandRequest::new("explode"), "unknown command: explode"),
            (
                CommandRequest::new("draw_line").arg("start", json!([0, 0])),
                "missing required argument: end",
            ),
            (
                CommandRequest::new("draw_line")
                    .arg("start", json!([0, 0, 0]))
                    .arg("end", json!([1, 0])),
                "invalid argument start: must have exactly 2 elements",
            ),
            (
                CommandRequest::new("draw_circle")
                    .arg("center", json!([0, 0]))
                    .arg("radius", 0),
                "invalid geometry: circle radius must be greater than 0 (got 0)",
            ),
            (
                CommandRequest::new("draw_polyline")
                    .arg("points", json!([[0, 0], [1, "a"]])),
                "invalid argument points[1][1]: must be a number",
            ),
            (
                CommandRequest::new("add_text")
                    .arg("text", "Hall")
                    .arg("position", json!([0, 0]))
                    .arg("layer", "NOPE"),
                "layer \"NOPE\" does not exist",
            ),
            (
                CommandRequest::new("add_layer")
                    .arg("name", "ARCH-WALL")
                    .arg("color", 3),
                "layer \"ARCH-WALL\" already exists",
            ),
            (
                CommandRequest::new("add_layer").arg("name", "X").arg("color", 256),
                "invalid argument color: must be at most 255",
            ),
        ];

        for (request, expected) in cases {
            let response = run(&bus, &mut session, request);
            assert!(!response.success);
            assert_eq!(response.message.as_deref(), Some(expected));
        }
        assert_eq!(session.document(), &archdxf_core::document::Document::new());
    }

    #[test]
    fn layer_commands_and_status() {
        let bus = CommandBus::new();
        let mut session = Session::new();

        let response = run(
            &bus,
            &mut session,
            CommandRequest::new("add_layer")
                .arg("name", "ARCH-STAIR")
                .arg("color", 5),
        );
        assert!(response.success);

        let response = run(
            &bus,
            &mut session,
            CommandRequest::new("set_layer").arg("name", "ARCH-STAIR"),
        );
        assert!(response.success);

        let response = run(&bus, &mut session, CommandRequest::new("status"));
        let data = response.data.expect("status data");
        assert_eq!(data["active_layer"], "ARCH-STAIR");
        assert_eq!(data["entity_count"], 0);
        assert_eq!(data["layers"].as_array().map(Vec::len), Some(8));
        assert_eq!(data["layers"][7], json!({ "name": "ARCH-STAIR", "color": 5 }));
    }

    #[test]
    fn save_file_writes_into_output_dir() {
        let dir = tempfile::tempdir().expect("temp dir");
        let bus = CommandBus::new();
        let mut session = Session::with_options(SessionOptions {
            output_dir: Some(dir.path().to_path_buf()),
            ..SessionOptions::default()
        });

        let response = run(
            &bus,
            &mut session,
            CommandRequest::new("save_file").arg("filename", "room_3x5"),
        );
        assert!(response.success, "{:?}", response.message);
        let expected = dir.path().join("room_3x5.dxf");
        assert_eq!(
            response.data,
            Some(json!({ "path": expected.display().to_string() }))
        );
        assert!(expected.is_file());

        let response = run(
            &bus,
            &mut session,
            CommandRequest::new("save_file").arg("filename", ""),
        );
        assert!(!response.success);
        assert_eq!(
            response.message.as_deref(),
            Some("invalid output path: filename is empty")
        );
        assert!(!dir.path().join(".dxf").exists());
    }

    #[test]
    fn available_commands_are_sorted() {
        let bus = CommandBus::new();
        assert_eq!(
            bus.available_commands(),
            [
                "add_layer",
                "add_text",
                "draw_arc",
                "draw_circle",
                "draw_line",
                "draw_polyline",
                "new_project",
                "save_file",
                "set_layer",
                "status"
            ]
        );
    }
}
