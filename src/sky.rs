//! Requesting ICON output for NWCSAF from the DWD SKY database.
//!
//! File names follow the NWCSAF Interface Control Document (NWC/CDOP3/GEO/AEMET/SW/ICD/1, §4.3).

use std::{
    io::Cursor,
    path::{Path, PathBuf},
};

use chrono::{NaiveDateTime, Timelike, Utc};
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use tracing::info;

use crate::{errors::FogToolsErr, external};

/// XML namespace of SKY requests.
pub const SKY_NS: &str = "http://dwd.de/sky";
const SKY_PREFIX: &str = "sky";

const SKYCAT: &str = "/Routine/ICON/Global/Regular Grid 13.0 km 90 Level/Main Run/Forecast";
const DB: &str = "roma";
const P_LEV: [u32; 15] = [
    1000, 3000, 5000, 7000, 10000, 15000, 20000, 25000, 30000, 40000, 50000, 70000, 85000, 92500,
    100000,
];
const SURF_PROPS_T0: [&str; 2] = ["HSURF", "FR_LAND"];
const SURF_PROPS_TX: [&str; 7] = ["T_2M", "TD_2M", "PS", "T_G", "TQV", "RELHUM_2M", "QV_2M"];
const LVL_PROPS: [&str; 5] = ["T", "RELHUM", "FI", "U", "V"];

/// Last forecast step requested, in hours.
pub const LAST_STEP: u32 = 5;

/// Where NWCSAF expects the ICON file for forecast step `step` from the run at `t`.
pub fn make_icon_nwcsaf_filename(base: &Path, t: NaiveDateTime, step: u32) -> PathBuf {
    base.join("import").join("NWP_data").join(format!(
        "S_NWC_NWP_{}_{:03}.grib",
        t.format("%Y-%m-%dT%H:%M:%SZ"),
        step
    ))
}

/// An element in the `sky` namespace.
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    name: &'static str,
    attrs: Vec<(&'static str, String)>,
    text: Option<String>,
    children: Vec<Element>,
}

impl Element {
    fn new(name: &'static str) -> Self {
        Element {
            name,
            attrs: vec![],
            text: None,
            children: vec![],
        }
    }

    fn attr(mut self, key: &'static str, val: impl Into<String>) -> Self {
        self.attrs.push((key, val.into()));
        self
    }

    fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    fn values<I, S>(self, vals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        vals.into_iter()
            .fold(self, |el, v| el.child(Element::new("value").text(v)))
    }

    /// The local name, without namespace prefix.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Value of an attribute.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    #[cfg(test)]
    fn text_content(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Child elements.
    pub fn children(&self) -> &[Element] {
        &self.children
    }

    // Without whitespace, declaring the namespace on this element.
    #[cfg(test)]
    fn to_xml(&self) -> Result<String, FogToolsErr> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        self.write(&mut writer, true)?;
        into_string(writer)
    }

    /// Serialize as a standalone document with indentation.
    pub fn to_document(&self) -> Result<String, FogToolsErr> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
            .map_err(xml_err)?;
        self.write(&mut writer, true)?;
        let mut doc = into_string(writer)?;
        doc.push('\n');
        Ok(doc)
    }

    fn write(
        &self,
        writer: &mut Writer<Cursor<Vec<u8>>>,
        is_root: bool,
    ) -> Result<(), FogToolsErr> {
        let qname = format!("{}:{}", SKY_PREFIX, self.name);
        let mut start = BytesStart::new(qname.as_str());
        if is_root {
            start.push_attribute(("xmlns:sky", SKY_NS));
        }
        for (key, val) in &self.attrs {
            start.push_attribute((*key, val.as_str()));
        }

        if self.text.is_none() && self.children.is_empty() {
            return writer.write_event(Event::Empty(start)).map_err(xml_err);
        }

        writer.write_event(Event::Start(start)).map_err(xml_err)?;
        if let Some(ref text) = self.text {
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(xml_err)?;
        }
        for child in &self.children {
            child.write(writer, false)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(qname.as_str())))
            .map_err(xml_err)
    }
}

fn xml_err<E: std::fmt::Display>(err: E) -> FogToolsErr {
    FogToolsErr::Xml(err.to_string())
}

fn into_string(writer: Writer<Cursor<Vec<u8>>>) -> Result<String, FogToolsErr> {
    String::from_utf8(writer.into_inner().into_inner()).map_err(xml_err)
}

/// Builds a SKY request for the ICON fields NWCSAF needs.
#[derive(Clone, Debug)]
pub struct RequestBuilder {
    base: PathBuf,
    start_time: NaiveDateTime,
}

impl RequestBuilder {
    /// Request data of the run starting at `start_time`, to be stored relative to `base`.
    pub fn new(base: &Path, start_time: NaiveDateTime) -> Self {
        RequestBuilder {
            base: base.to_path_buf(),
            start_time,
        }
    }

    #[allow(missing_docs)]
    pub fn refdate(&self) -> Element {
        Element::new("referenceDate")
            .child(Element::new("value").text(self.start_time.format("%Y%m%d%H%M%S").to_string()))
    }

    /// Select forecast step `step`.
    pub fn step(&self, step: u32) -> Element {
        Element::new("field").child(Element::new("value").text(format!("{:02}", step)))
    }

    #[allow(missing_docs)]
    pub fn sort_order(&self) -> Element {
        Element::new("sort")
            .child(Element::new("order").attr("name", "FIRST_LEVEL"))
            .child(Element::new("order").attr("name", "PARAMETER_SHORTNAME"))
    }

    #[allow(missing_docs)]
    pub fn result(&self) -> Element {
        Element::new("result")
            .child(Element::new("binary"))
            .child(Element::new("info").attr("level", "countXML"))
    }

    /// Where SKY writes the data for forecast step `step`.
    pub fn transfer(&self, step: u32) -> Element {
        let name = make_icon_nwcsaf_filename(&self.base, self.start_time, step);
        Element::new("transfer").child(
            Element::new("file")
                .attr("hitFile", "ihits")
                .attr("infoFile", "info")
                .attr("name", name.to_string_lossy()),
        )
    }

    /// Request GRIB edition 2.
    pub fn edition(&self) -> Element {
        Element::new("field")
            .attr("name", "edit")
            .child(Element::new("value").text("2"))
    }

    fn shortnames(names: &[&str]) -> Element {
        Element::new("field")
            .attr("name", "PARAMETER_SHORTNAME")
            .values(names.iter().copied())
    }

    /// Surface fields valid at analysis time.
    pub fn select_surf_anal_props(&self) -> Element {
        Element::new("select")
            .attr("category", SKYCAT)
            .child(self.refdate())
            .child(self.step(0))
            .child(Self::shortnames(&SURF_PROPS_T0))
            .child(self.edition())
    }

    /// Surface fields for forecast step `step`.
    pub fn select_surf_forc_props(&self, step: u32) -> Element {
        Element::new("select")
            .attr("category", SKYCAT)
            .child(self.refdate())
            .child(self.step(step))
            .child(Self::shortnames(&SURF_PROPS_TX))
            .child(self.edition())
    }

    /// Pressure level fields for forecast step `step`.
    pub fn select_level_props(&self, step: u32) -> Element {
        Element::new("select")
            .attr("category", SKYCAT)
            .child(self.refdate())
            .child(self.step(step))
            .child(Self::shortnames(&LVL_PROPS))
            .child(
                Element::new("field")
                    .attr("name", "FIRST_LEVEL")
                    .values(P_LEV.iter().map(|p| p.to_string())),
            )
            .child(self.edition())
    }

    fn read(&self, select: Element, sorted: bool, step: u32) -> Element {
        let read = Element::new("read").attr("database", DB).child(select);
        let read = if sorted {
            read.child(self.sort_order())
        } else {
            read
        };
        read.child(self.result()).child(self.transfer(step))
    }

    /// The complete request: the analysis, then surface and level fields for each step.
    pub fn get_request(&self) -> Element {
        let coll = Element::new("requestCollection")
            .attr("processing", "sequential")
            .attr("ifErr", "go")
            .attr("priority", "1")
            .attr("validate", "true")
            .attr("append", "false")
            .child(self.read(self.select_surf_anal_props(), false, 0));

        (1..=LAST_STEP).fold(coll, |coll, step| {
            coll.child(self.read(self.select_surf_forc_props(step), true, step))
                .child(self.read(self.select_level_props(step), true, step))
        })
    }
}

/// The request document for the run at `t`.
pub fn make_icon_request_for_nwcsaf(base: &Path, t: NaiveDateTime) -> Result<String, FogToolsErr> {
    RequestBuilder::new(base, t).get_request().to_document()
}

/// Check that `t` is a main ICON run that has already started.
pub fn verify_period(t: NaiveDateTime) -> Result<(), FogToolsErr> {
    verify_period_at(t, Utc::now().naive_utc())
}

fn verify_period_at(t: NaiveDateTime, now: NaiveDateTime) -> Result<(), FogToolsErr> {
    if t.hour() % 6 != 0 || t.minute() != 0 || t.second() != 0 || t.nanosecond() != 0 {
        return Err(FogToolsErr::InvalidPeriod(format!(
            "{} is not an ICON main run, use 00, 06, 12 or 18 UTC",
            t
        )));
    }
    if t > now {
        return Err(FogToolsErr::InvalidPeriod(format!("{} is in the future", t)));
    }

    Ok(())
}

/// The files SKY writes for the run at `t`, one per forecast step.
pub fn expected_files(base: &Path, t: NaiveDateTime) -> Vec<PathBuf> {
    (0..=LAST_STEP)
        .map(|step| make_icon_nwcsaf_filename(base, t, step))
        .collect()
}

/// Write the request for the run at `t` and send it with the SKY client `sky_command`.
///
/// Returns the files the request produces.
pub fn get_and_send(
    base: &Path,
    t: NaiveDateTime,
    sky_command: &[String],
) -> Result<Vec<PathBuf>, FogToolsErr> {
    let request = make_icon_request_for_nwcsaf(base, t)?;
    let nwp_dir = base.join("import").join("NWP_data");
    std::fs::create_dir_all(&nwp_dir)?;

    let request_file = nwp_dir.join(format!("sky_request_{}.xml", t.format("%Y%m%dT%H%M%S")));
    std::fs::write(&request_file, request)?;

    info!("Sending SKY request {}", request_file.display());
    let mut cmd = external::command(sky_command)?;
    cmd.arg(&request_file);
    external::run_checked(cmd)?;

    Ok(expected_files(base, t))
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 2, 24)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn rb() -> RequestBuilder {
        RequestBuilder::new(Path::new("/fake/path"), t0())
    }

    #[test]
    fn test_icon_filename() {
        assert_eq!(
            make_icon_nwcsaf_filename(Path::new("/fake/path"), t0(), 3),
            PathBuf::from("/fake/path/import/NWP_data/S_NWC_NWP_2020-02-24T12:00:00Z_003.grib")
        );
    }

    #[test]
    fn test_refdate() {
        assert_eq!(
            rb().refdate().to_xml().unwrap(),
            r#"<sky:referenceDate xmlns:sky="http://dwd.de/sky"><sky:value>20200224120000</sky:value></sky:referenceDate>"#
        );
    }

    #[test]
    fn test_step() {
        assert_eq!(
            rb().step(0).to_xml().unwrap(),
            r#"<sky:field xmlns:sky="http://dwd.de/sky"><sky:value>00</sky:value></sky:field>"#
        );
        assert_eq!(
            rb().step(5).to_xml().unwrap(),
            r#"<sky:field xmlns:sky="http://dwd.de/sky"><sky:value>05</sky:value></sky:field>"#
        );
    }

    #[test]
    fn test_sort_order() {
        assert_eq!(
            rb().sort_order().to_xml().unwrap(),
            r#"<sky:sort xmlns:sky="http://dwd.de/sky"><sky:order name="FIRST_LEVEL"/><sky:order name="PARAMETER_SHORTNAME"/></sky:sort>"#
        );
    }

    #[test]
    fn test_result() {
        assert_eq!(
            rb().result().to_xml().unwrap(),
            r#"<sky:result xmlns:sky="http://dwd.de/sky"><sky:binary/><sky:info level="countXML"/></sky:result>"#
        );
    }

    #[test]
    fn test_transfer() {
        assert_eq!(
            rb().transfer(5).to_xml().unwrap(),
            r#"<sky:transfer xmlns:sky="http://dwd.de/sky"><sky:file hitFile="ihits" infoFile="info" name="/fake/path/import/NWP_data/S_NWC_NWP_2020-02-24T12:00:00Z_005.grib"/></sky:transfer>"#
        );
    }

    #[test]
    fn test_edition() {
        assert_eq!(
            rb().edition().to_xml().unwrap(),
            r#"<sky:field xmlns:sky="http://dwd.de/sky" name="edit"><sky:value>2</sky:value></sky:field>"#
        );
    }

    #[test]
    fn test_surf_anal_props() {
        let sel = rb().select_surf_anal_props();
        assert_eq!(sel.get("category"), Some(SKYCAT));
        assert_eq!(
            sel.children()[2].to_xml().unwrap(),
            r#"<sky:field xmlns:sky="http://dwd.de/sky" name="PARAMETER_SHORTNAME"><sky:value>HSURF</sky:value><sky:value>FR_LAND</sky:value></sky:field>"#
        );
    }

    #[test]
    fn test_surf_forc_props() {
        let sel = rb().select_surf_forc_props(3);
        let fields = sel.children();

        assert_eq!(fields[1].children()[0].text_content(), Some("03"));
        assert_eq!(fields[2].children()[0].text_content(), Some("T_2M"));
        assert_eq!(fields[2].children()[6].text_content(), Some("QV_2M"));
        assert_eq!(fields[2].children().len(), 7);
    }

    #[test]
    fn test_level_props() {
        let sel = rb().select_level_props(5);
        let fields = sel.children();

        assert_eq!(fields[1].children()[0].text_content(), Some("05"));
        assert_eq!(fields[2].children()[0].text_content(), Some("T"));
        assert_eq!(fields[2].children()[4].text_content(), Some("V"));
        assert_eq!(fields[2].children().len(), 5);
        assert_eq!(fields[3].children().len(), 15);
        assert_eq!(fields[3].children()[0].text_content(), Some("1000"));
        assert_eq!(fields[3].children()[14].text_content(), Some("100000"));
    }

    #[test]
    fn test_get_request() {
        let req = rb().get_request();
        let reads = req.children();

        assert_eq!(reads.len(), 1 + 2 * LAST_STEP as usize);
        assert!(reads.iter().all(|r| r.name() == "read"));
        assert!(reads.iter().all(|r| r.get("database") == Some("roma")));
        assert_eq!(
            reads[0].children()[0].children()[0].children()[0].text_content(),
            Some("20200224120000")
        );
        assert_eq!(
            reads[2].children()[3].children()[0].get("name"),
            Some("/fake/path/import/NWP_data/S_NWC_NWP_2020-02-24T12:00:00Z_001.grib")
        );
        assert_eq!(
            reads[10].children()[3].children()[0].get("name"),
            Some("/fake/path/import/NWP_data/S_NWC_NWP_2020-02-24T12:00:00Z_005.grib")
        );
    }

    #[test]
    fn test_make_icon_request() {
        let doc = make_icon_request_for_nwcsaf(Path::new("/fake/path"), t0()).unwrap();

        assert!(!doc.contains('\''));
        assert!(doc.starts_with(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#));
        assert!(doc.contains("\n  <sky:read database=\"roma\">"));
        assert!(doc.contains("<sky:value>HSURF</sky:value>"));
    }

    #[test]
    fn test_verify_period() {
        let now = t0() + chrono::Duration::days(1);

        assert!(verify_period_at(t0(), now).is_ok());
        assert!(verify_period_at(t0() + chrono::Duration::hours(3), now).is_err());
        assert!(verify_period_at(t0() + chrono::Duration::minutes(1), now).is_err());
        assert!(verify_period_at(t0() + chrono::Duration::days(2), now).is_err());
        assert!(verify_period(
            NaiveDate::from_ymd_opt(1900, 1, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap()
        )
        .is_ok());
    }

    #[test]
    fn test_get_and_send() {
        let tmp = TempDir::new().unwrap();

        let files = get_and_send(tmp.path(), t0(), &["true".to_owned()]).unwrap();
        assert_eq!(files.len(), 6);
        assert_eq!(files[0], make_icon_nwcsaf_filename(tmp.path(), t0(), 0));
        let request = tmp
            .path()
            .join("import/NWP_data/sky_request_20200224T120000.xml");
        assert!(request.is_file());

        assert!(get_and_send(tmp.path(), t0(), &["false".to_owned()]).is_err());
    }
}
