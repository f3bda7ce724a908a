use serde::Serialize;
use url::form_urlencoded::byte_serialize;
use utoipa::ToSchema;

use crate::utils::identity::digits_only;

#[derive(Debug, Clone)]
pub struct HelpDesk {
    pub phone: String,
    pub country_code: String,
    pub whatsapp_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HelpContact {
    #[schema(example = "9876543210")]
    pub phone: String,
    #[schema(example = "tel:+919876543210")]
    pub call_link: String,
    #[schema(example = "https://wa.me/919876543210?text=Hello")]
    pub whatsapp_link: String,
}

impl HelpDesk {
    pub fn contact(&self) -> HelpContact {
        let phone = digits_only(&self.phone);
        let cc = digits_only(&self.country_code);

        let mut wa = format!("https://wa.me/{cc}{phone}");
        if !self.whatsapp_message.is_empty() {
            let text: String = byte_serialize(self.whatsapp_message.as_bytes()).collect();
            wa.push_str("?text=");
            wa.push_str(&text);
        }

        HelpContact {
            call_link: format!("tel:+{cc}{phone}"),
            whatsapp_link: wa,
            phone,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_links() {
        let desk = HelpDesk {
            phone: "98765 43210".into(),
            country_code: "+91".into(),
            whatsapp_message: "Hello, I need help with the portal".into(),
        };
        let c = desk.contact();
        assert_eq!(c.phone, "9876543210");
        assert_eq!(c.call_link, "tel:+919876543210");
        assert_eq!(
            c.whatsapp_link,
            "https://wa.me/919876543210?text=Hello%2C+I+need+help+with+the+portal"
        );
    }
}
