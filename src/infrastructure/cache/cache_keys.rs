use crate::core::listing::DeviceClass;

const POST_RESOURCE_BY_ID: &str = "post_resource_by_id";
const THREAD_RESOURCE_BY_ID: &str = "thread_resource_by_id";

pub fn post_listing_key(device: DeviceClass, thread_id: Option<&str>) -> String {
    format!("{}:{}:{}", POST_RESOURCE_BY_ID, device.flag(), thread_id.unwrap_or("all"))
}

pub fn thread_resource_key(device: DeviceClass, thread_id: &str) -> String {
    format!("{}:{}:{}", THREAD_RESOURCE_BY_ID, device.flag(), thread_id)
}
