use crate::model::{InfoValue, RawSnapshot, Register};
use serde::Deserialize;

/* {"sn":"SXXXXXXXXX","ver":"3.008.10","type":14,"Data":[...],"Information":[...]} */
#[derive(Deserialize)]
pub struct ReadRealTimeData {
    #[serde(rename = "Data", default)]
    pub data: Vec<Register>,
    #[serde(rename = "Information", default)]
    pub information: Vec<InfoValue>,
    pub ver: Option<String>,
    pub sn: Option<String>,
}

impl From<ReadRealTimeData> for RawSnapshot {
    fn from(response: ReadRealTimeData) -> Self {
        RawSnapshot::with_registers(response.data, response.information, response.ver)
    }
}
