use crate::commands::Out;
use crate::format::format_currency;
use crate::model::record::MAX_TAXABLE_AMOUNT;
use crate::model::{Amount, TaxPreview, TaxSlab};
use rust_decimal::Decimal;

/// Previews the tax on `amount` under `slab`. Nothing is sent to the server.
pub fn tax(amount: Amount, slab: &TaxSlab) -> Out<TaxPreview> {
    let preview = TaxPreview::new(amount, slab);
    let mut message = format!(
        "{slab}\n  Taxable: {}\n  Tax ({}%): {}\n  Total: {}",
        format_currency(preview.taxable),
        preview.rate_percent.normalize(),
        format_currency(preview.tax),
        format_currency(preview.total),
    );
    if !amount.is_positive() {
        message.push_str("\n  Note: a record needs a taxable amount greater than 0");
    } else if amount.value() > Decimal::from(MAX_TAXABLE_AMOUNT) {
        message.push_str(&format!(
            "\n  Note: a record needs a taxable amount of at most {}",
            format_currency(Amount::from(MAX_TAXABLE_AMOUNT))
        ));
    }
    Out::new(message, preview)
}
