// Human-readable output for users and tiers

use std::io::{self, Write};

use beacon_shared::{format_duration, format_size};
use beacon_store::{Tier, User};

/// One line per user: `user phil (role: user, tier: pro)`.
pub fn write_user(out: &mut impl Write, user: &User) -> io::Result<()> {
    writeln!(
        out,
        "user {} (role: {}, tier: {})",
        user.username,
        user.role,
        user.tier.as_deref().unwrap_or("none")
    )
}

/// Multi-line description of a tier, sizes and durations in human units.
pub fn write_tier(out: &mut impl Write, tier: &Tier) -> io::Result<()> {
    let l = &tier.limits;
    writeln!(out, "tier {} (id: {})", tier.code, tier.id)?;
    writeln!(out, "- Name: {}", tier.name)?;
    writeln!(out, "- Message limit: {}", l.message_limit)?;
    writeln!(
        out,
        "- Message expiry duration: {}",
        format_duration(l.message_expiry_duration)
    )?;
    writeln!(out, "- Email limit: {}", l.email_limit)?;
    writeln!(out, "- Reservation limit: {}", l.reservation_limit)?;
    writeln!(
        out,
        "- Attachment file size limit: {}",
        format_size(l.attachment_file_size_limit)
    )?;
    writeln!(
        out,
        "- Attachment total size limit: {}",
        format_size(l.attachment_total_size_limit)
    )?;
    writeln!(
        out,
        "- Attachment expiry duration: {}",
        format_duration(l.attachment_expiry_duration)
    )?;
    writeln!(
        out,
        "- Attachment daily bandwidth limit: {}",
        format_size(l.attachment_bandwidth_limit)
    )?;
    writeln!(
        out,
        "- Stripe prices (monthly/yearly): {} / {}",
        tier.stripe_monthly_price_id.as_deref().unwrap_or("(none)"),
        tier.stripe_yearly_price_id.as_deref().unwrap_or("(none)")
    )
}

#[cfg(test)]
mod tests {
    use beacon_shared::{Role, TierId};
    use beacon_store::TierLimits;
    use chrono::Utc;

    use super::*;

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_user_line() {
        let mut user = User {
            username: "phil".to_string(),
            role: Role::User,
            tier: None,
            created_at: Utc::now(),
        };
        assert_eq!(
            render(|out| write_user(out, &user)),
            "user phil (role: user, tier: none)\n"
        );

        user.role = Role::Admin;
        user.tier = Some("pro".to_string());
        assert_eq!(
            render(|out| write_user(out, &user)),
            "user phil (role: admin, tier: pro)\n"
        );
    }

    #[test]
    fn test_tier_block() {
        let tier = Tier {
            id: "ti_123456789012345678901".parse::<TierId>().unwrap(),
            code: "pro".to_string(),
            name: "Pro".to_string(),
            limits: TierLimits {
                message_limit: 1234,
                message_expiry_duration: 172_800,
                email_limit: 91,
                reservation_limit: 98,
                attachment_file_size_limit: 100_000_000,
                attachment_total_size_limit: 10_000_000_000,
                attachment_expiry_duration: 86_400,
                attachment_bandwidth_limit: 100_000_000_000,
            },
            stripe_monthly_price_id: Some("price_991".to_string()),
            stripe_yearly_price_id: None,
        };

        let expected = "\
tier pro (id: ti_123456789012345678901)
- Name: Pro
- Message limit: 1234
- Message expiry duration: 48h
- Email limit: 91
- Reservation limit: 98
- Attachment file size limit: 100.0 MB
- Attachment total size limit: 10.0 GB
- Attachment expiry duration: 24h
- Attachment daily bandwidth limit: 100.0 GB
- Stripe prices (monthly/yearly): price_991 / (none)
";
        assert_eq!(render(|out| write_tier(out, &tier)), expected);
    }
}
