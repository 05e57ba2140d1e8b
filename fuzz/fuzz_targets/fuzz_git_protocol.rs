//! Fuzz target for smart HTTP response parsing.

#![no_main]

use ferry_git::protocol::{
    parse_report_status, read_upload_response, RefAdvertisement, RECEIVE_PACK, UPLOAD_PACK,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(adv) = RefAdvertisement::parse(data, UPLOAD_PACK) {
        let _ = adv.head_target();
        let _ = adv.transferable().count();
    }
    let _ = RefAdvertisement::parse(data, RECEIVE_PACK);

    let _ = read_upload_response(data, true);
    let _ = read_upload_response(data, false);

    if let Ok(report) = parse_report_status(data) {
        let _ = report.into_result();
    }
});
