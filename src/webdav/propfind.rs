//! PROPFIND request parsing and multistatus response rendering
//! ([MODULE K]).

use quick_xml::events::Event;
use quick_xml::Reader;
use quick_xml::Writer;

use crate::backend::{Backend, ResourceInfo};
use crate::path::{self, Segments};

const FIXED_LAST_MODIFIED: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Zero,
    One,
    Infinity,
}

impl Depth {
    pub fn parse(header: Option<&str>) -> Self {
        match header {
            Some("0") => Depth::Zero,
            Some("infinity") => Depth::Infinity,
            _ => Depth::One,
        }
    }
}

/// Which DAV properties a client asked for. `allprop` is both the default
/// (empty/absent/malformed body) and an explicit request.
pub struct PropfindRequest {
    all: bool,
    props: Vec<String>,
}

impl PropfindRequest {
    fn allprop() -> Self {
        Self {
            all: true,
            props: Vec::new(),
        }
    }

    fn wants(&self, name: &str) -> bool {
        self.all || self.props.iter().any(|p| p == name)
    }
}

fn local_name(qname: quick_xml::name::QName) -> String {
    String::from_utf8_lossy(qname.local_name().as_ref()).to_string()
}

/// Parse a PROPFIND request body. Any parse failure, as well as an empty
/// body, is treated as `allprop` rather than surfaced as an error.
pub fn parse_request(body: &[u8]) -> PropfindRequest {
    if body.is_empty() {
        return PropfindRequest::allprop();
    }
    parse_body(body).unwrap_or_else(|_| PropfindRequest::allprop())
}

fn parse_body(body: &[u8]) -> Result<PropfindRequest, quick_xml::Error> {
    let mut reader = Reader::from_reader(body);
    reader.config_mut().trim_text(true);

    let mut found_allprop = false;
    let mut in_prop = false;
    let mut props = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = local_name(e.name());
                if name == "prop" {
                    in_prop = true;
                } else if name == "allprop" {
                    found_allprop = true;
                } else if in_prop {
                    props.push(name);
                }
            }
            Event::Empty(e) => {
                let name = local_name(e.name());
                if name == "allprop" {
                    found_allprop = true;
                } else if in_prop {
                    props.push(name);
                }
            }
            Event::End(e) => {
                if local_name(e.name()) == "prop" {
                    in_prop = false;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if found_allprop || props.is_empty() {
        Ok(PropfindRequest::allprop())
    } else {
        Ok(PropfindRequest {
            all: false,
            props,
        })
    }
}

/// Collect the set of (segments, info) pairs a PROPFIND response must
/// describe for `target` at the given depth. Per-child errors below
/// `Depth::Zero` are skipped rather than failing the whole traversal.
pub fn collect(
    backend: &dyn Backend,
    target: &Segments,
    target_info: ResourceInfo,
    depth: Depth,
) -> Vec<(Segments, ResourceInfo)> {
    let mut out = vec![(target.clone(), target_info.clone())];
    if depth == Depth::Zero || !target_info.is_dir {
        return out;
    }
    match depth {
        Depth::One => {
            if let Ok(children) = backend.list(target) {
                for name in children {
                    let child = path::join(target, &name);
                    if let Ok(info) = backend.info(&child) {
                        out.push((child, info));
                    }
                }
            }
        }
        Depth::Infinity => walk(backend, target, &mut out),
        Depth::Zero => {}
    }
    out
}

fn walk(backend: &dyn Backend, dir: &Segments, out: &mut Vec<(Segments, ResourceInfo)>) {
    let Ok(children) = backend.list(dir) else {
        return;
    };
    for name in children {
        let child = path::join(dir, &name);
        let Ok(info) = backend.info(&child) else {
            continue;
        };
        let is_dir = info.is_dir;
        out.push((child.clone(), info));
        if is_dir {
            walk(backend, &child, out);
        }
    }
}

/// Render a multistatus document for the collected entries.
pub fn render(entries: &[(Segments, ResourceInfo)], req: &PropfindRequest) -> Vec<u8> {
    let mut buf: Vec<u8> = Vec::new();
    let mut writer = Writer::new(&mut buf);

    writer
        .write_event(Event::Decl(quick_xml::events::BytesDecl::new(
            "1.0",
            Some("UTF-8"),
            None,
        )))
        .expect("writing to an in-memory buffer cannot fail");

    writer
        .create_element("D:multistatus")
        .with_attribute(("xmlns:D", "DAV:"))
        .write_inner_content::<_, std::convert::Infallible>(|writer| {
            for (segments, info) in entries {
                write_response(writer, segments, info, req);
            }
            Ok(())
        })
        .expect("writing to an in-memory buffer cannot fail");

    buf
}

fn write_response(
    writer: &mut Writer<&mut Vec<u8>>,
    segments: &Segments,
    info: &ResourceInfo,
    req: &PropfindRequest,
) {
    let href = path::to_href(segments, info.is_dir);

    writer
        .create_element("D:response")
        .write_inner_content::<_, std::convert::Infallible>(|writer| {
            writer
                .create_element("D:href")
                .write_text_content(quick_xml::events::BytesText::new(&href))
                .unwrap();

            writer
                .create_element("D:propstat")
                .write_inner_content::<_, std::convert::Infallible>(|writer| {
                    writer
                        .create_element("D:prop")
                        .write_inner_content::<_, std::convert::Infallible>(|writer| {
                            write_props(writer, segments, info, req);
                            Ok(())
                        })
                        .unwrap();
                    writer
                        .create_element("D:status")
                        .write_text_content(quick_xml::events::BytesText::new("HTTP/1.1 200 OK"))
                        .unwrap();
                    Ok(())
                })
                .unwrap();
            Ok(())
        })
        .unwrap();
}

fn write_props(
    writer: &mut Writer<&mut Vec<u8>>,
    segments: &Segments,
    info: &ResourceInfo,
    req: &PropfindRequest,
) {
    if req.wants("displayname") {
        let name = segments.last().map(|s| s.as_str()).unwrap_or("/");
        writer
            .create_element("D:displayname")
            .write_text_content(quick_xml::events::BytesText::new(name))
            .unwrap();
    }

    if !info.is_dir && req.wants("getcontentlength") {
        writer
            .create_element("D:getcontentlength")
            .write_text_content(quick_xml::events::BytesText::new(&info.size.to_string()))
            .unwrap();
    }

    if !info.is_dir && req.wants("getcontenttype") {
        writer
            .create_element("D:getcontenttype")
            .write_text_content(quick_xml::events::BytesText::new(&info.content_type))
            .unwrap();
    }

    if req.wants("resourcetype") {
        if info.is_dir {
            writer
                .create_element("D:resourcetype")
                .write_inner_content::<_, std::convert::Infallible>(|writer| {
                    writer.create_element("D:collection").write_empty().unwrap();
                    Ok(())
                })
                .unwrap();
        } else {
            writer.create_element("D:resourcetype").write_empty().unwrap();
        }
    }

    if req.wants("getlastmodified") {
        writer
            .create_element("D:getlastmodified")
            .write_text_content(quick_xml::events::BytesText::new(FIXED_LAST_MODIFIED))
            .unwrap();
    }
}
