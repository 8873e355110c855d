use std::io::{self, Write};

use archdxf_core::document::{Document, Entity, EntityRecord, Layer};
use archdxf_core::geometry::Point2;

/// R12 版本标记。LWPOLYLINE 属于 R14 实体，但主流读取器在 R12 文件中同样接受。
const ACAD_VERSION: &str = "AC1009";
/// `$INSUNITS` = 6，图纸单位为米。
const INSERT_UNITS_METERS: i32 = 6;
const CONTINUOUS: &str = "CONTINUOUS";
const LWPOLYLINE_CLOSED: i32 = 1;

/// 将文档编码为 DXF ASCII 文本。相同内容总是产生逐字节相同的输出。
pub fn encode(document: &Document) -> String {
    let mut writer = TagWriter::default();
    write_header(&mut writer);
    write_tables(&mut writer, document);
    write_entities(&mut writer, document);
    writer.pair(0, "EOF");
    writer.finish()
}

/// 编码后一次性写入目标流。
pub fn write_document<W: Write>(document: &Document, mut sink: W) -> io::Result<()> {
    sink.write_all(encode(document).as_bytes())?;
    sink.flush()
}

/// 组码/值成对输出，每个值独占一行。
#[derive(Default)]
struct TagWriter {
    buffer: String,
}

impl TagWriter {
    fn pair(&mut self, code: u16, value: &str) {
        self.buffer.push_str(&code.to_string());
        self.buffer.push('\n');
        self.buffer.push_str(value);
        self.buffer.push('\n');
    }

    fn int(&mut self, code: u16, value: impl Into<i64>) {
        self.pair(code, &value.into().to_string());
    }

    fn real(&mut self, code: u16, value: f64) {
        self.pair(code, &format_real(value));
    }

    /// 三坐标点：`base` 为 X 组码，Y/Z 分别为 `base + 10` / `base + 20`。
    fn point(&mut self, base: u16, point: Point2) {
        self.real(base, point.x());
        self.real(base + 10, point.y());
        self.real(base + 20, 0.0);
    }

    fn begin_section(&mut self, name: &str) {
        self.pair(0, "SECTION");
        self.pair(2, name);
    }

    fn end_section(&mut self) {
        self.pair(0, "ENDSEC");
    }

    fn finish(self) -> String {
        self.buffer
    }
}

fn write_header(writer: &mut TagWriter) {
    writer.begin_section("HEADER");
    writer.pair(9, "$ACADVER");
    writer.pair(1, ACAD_VERSION);
    writer.pair(9, "$INSBASE");
    writer.point(10, Point2::new(0.0, 0.0));
    writer.pair(9, "$INSUNITS");
    writer.int(70, INSERT_UNITS_METERS);
    writer.end_section();
}

fn write_tables(writer: &mut TagWriter, document: &Document) {
    writer.begin_section("TABLES");

    writer.pair(0, "TABLE");
    writer.pair(2, "LTYPE");
    writer.int(70, 1);
    writer.pair(0, "LTYPE");
    writer.pair(2, CONTINUOUS);
    writer.int(70, 0);
    writer.pair(3, "Solid line");
    writer.int(72, 65);
    writer.int(73, 0);
    writer.real(40, 0.0);
    writer.pair(0, "ENDTAB");

    writer.pair(0, "TABLE");
    writer.pair(2, "LAYER");
    writer.int(70, document.layer_count() as i64);
    for layer in document.layers() {
        write_layer(writer, layer);
    }
    writer.pair(0, "ENDTAB");

    writer.end_section();
}

fn write_layer(writer: &mut TagWriter, layer: &Layer) {
    writer.pair(0, "LAYER");
    writer.pair(2, &layer.name);
    writer.int(70, 0);
    writer.int(62, layer.color.get());
    writer.pair(6, CONTINUOUS);
}

fn write_entities(writer: &mut TagWriter, document: &Document) {
    writer.begin_section("ENTITIES");
    for record in document.entities() {
        write_entity(writer, record);
    }
    writer.end_section();
}

fn write_entity(writer: &mut TagWriter, record: &EntityRecord) {
    match &record.entity {
        Entity::Line(line) => {
            writer.pair(0, "LINE");
            writer.pair(8, &record.layer);
            writer.point(10, line.start);
            writer.point(11, line.end);
        }
        Entity::Polyline(polyline) => {
            writer.pair(0, "LWPOLYLINE");
            writer.pair(8, &record.layer);
            writer.int(90, polyline.vertices.len() as i64);
            writer.int(
                70,
                if polyline.closed { LWPOLYLINE_CLOSED } else { 0 },
            );
            for vertex in &polyline.vertices {
                writer.real(10, vertex.x());
                writer.real(20, vertex.y());
            }
        }
        Entity::Arc(arc) => {
            writer.pair(0, "ARC");
            writer.pair(8, &record.layer);
            writer.point(10, arc.center);
            writer.real(40, arc.radius);
            writer.real(50, arc.start_angle_deg);
            writer.real(51, arc.end_angle_deg);
        }
        Entity::Circle(circle) => {
            writer.pair(0, "CIRCLE");
            writer.pair(8, &record.layer);
            writer.point(10, circle.center);
            writer.real(40, circle.radius);
        }
        Entity::Text(text) => {
            writer.pair(0, "TEXT");
            writer.pair(8, &record.layer);
            writer.point(10, text.position);
            writer.real(40, text.height);
            writer.pair(1, &text.content);
        }
    }
}

/// 最短往返十进制表示，始终带小数部分；负零输出为 `0.0`。
fn format_real(value: f64) -> String {
    let value = if value == 0.0 { 0.0 } else { value };
    let mut text = value.to_string();
    if !text.contains('.') {
        text.push_str(".0");
    }
    text
}
